use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, ComposerError, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

/// Wraps `naga_oil::compose::Composer` to provide shader composition with `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Stage sources use
/// `#import bloomfx::module_name` to pull in shared code. The composer produces
/// `naga::Module` IR directly, which is then reflected and handed to wgpu
/// without a second WGSL parse.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

const SHARED_MODULES: &[ModuleDef] = &[ModuleDef {
    source: include_str!("../../assets/shaders/modules/color.wgsl"),
    file_path: "modules/color.wgsl",
}];

impl ShaderComposer {
    /// Create a composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns the composer error if a built-in module fails to register.
    pub fn new() -> Result<Self, Box<ComposerError>> {
        let mut composer = Composer::default();

        // Register shared modules in dependency order.
        for m in SHARED_MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(Box::new)?;
        }

        Ok(Self { composer })
    }

    /// Compose a shader source (which may contain `#import` directives)
    /// into a `naga::Module` without touching the GPU.
    ///
    /// # Errors
    ///
    /// Returns the composer diagnostic if the source does not parse or an
    /// import cannot be resolved.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, String> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| e.emit_to_string(&self.composer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_modules_register() {
        assert!(ShaderComposer::new().is_ok());
    }

    #[test]
    fn import_resolves_shared_luminance() {
        let mut composer = ShaderComposer::new().unwrap();
        let source = r"
#import bloomfx::color

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let l = color::luminance(vec3<f32>(1.0, 1.0, 1.0));
    return vec4<f32>(l, l, l, 1.0);
}
";
        let module = composer.compose_naga(source, "inline.wgsl").unwrap();
        assert_eq!(module.entry_points.len(), 1);
    }

    #[test]
    fn unknown_import_is_reported() {
        let mut composer = ShaderComposer::new().unwrap();
        let source = r"
#import bloomfx::missing

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(missing::value());
}
";
        assert!(composer.compose_naga(source, "broken.wgsl").is_err());
    }
}
