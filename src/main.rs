//! Demo viewer: `bloomfx [options.toml]`.

use bloomfx::Viewer;

fn main() {
    env_logger::init();

    let mut builder = Viewer::builder();
    if let Some(path) = std::env::args().nth(1) {
        log::info!("loading options from {path}");
        builder = builder.with_options_path(path);
    }

    if let Err(e) = builder.build().run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
