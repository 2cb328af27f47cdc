//! Stage descriptors and the registry.
//!
//! Registration is an explicit startup step: the driver assembles a
//! [`StageRegistry`] from the descriptors it intends to run and hands it to
//! the context. There is no registration by module-load side effect, so a
//! process can assemble registries without ordering hazards.

use std::collections::BTreeMap;

use sunbeam_core::{ConfigError, FileType};

/// A declared stage output: its artifact name and type tag. Skipped stages
/// materialize a null-data artifact of this type at the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutput {
    pub name: &'static str,
    pub file_type: FileType,
}

/// Static description of a stage class: its unique name, the stages whose
/// outputs it may consume, and the outputs it materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub name: &'static str,
    pub dependencies: &'static [&'static str],
    pub outputs: &'static [StageOutput],
}

impl StageDescriptor {
    pub fn depends_on(&self, source: &str) -> bool {
        self.dependencies.contains(&source)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.outputs.iter().map(|o| o.name)
    }
}

/// Name-keyed table of stage descriptors.
#[derive(Debug, Default)]
pub struct StageRegistry {
    stages: BTreeMap<&'static str, &'static StageDescriptor>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Registering the identical descriptor under
    /// the same name again is a no-op; a different descriptor under an
    /// existing name is a configuration error.
    pub fn register(&mut self, descriptor: &'static StageDescriptor) -> Result<(), ConfigError> {
        match self.stages.get(descriptor.name) {
            Some(existing) if *existing == descriptor => Ok(()),
            Some(_) => Err(ConfigError::ConflictingRegistration {
                name: descriptor.name.to_string(),
            }),
            None => {
                self.stages.insert(descriptor.name, descriptor);
                Ok(())
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&'static StageDescriptor, ConfigError> {
        self.stages
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnregisteredStage {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.keys().copied()
    }
}

/// The registry of stages this crate ships.
pub fn builtin_registry() -> StageRegistry {
    let mut registry = StageRegistry::new();
    // Descriptors are distinct statics; none of these can conflict.
    for descriptor in [
        &crate::ingress::INGRESS_DESCRIPTOR,
        &crate::power::POWER_DESCRIPTOR,
        &crate::energy::ENERGY_DESCRIPTOR,
    ] {
        registry
            .register(descriptor)
            .unwrap_or_else(|_| unreachable!("builtin descriptors are unique"));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    static A: StageDescriptor = StageDescriptor {
        name: "a",
        dependencies: &[],
        outputs: &[],
    };
    static A_CONFLICT: StageDescriptor = StageDescriptor {
        name: "a",
        dependencies: &["b"],
        outputs: &[],
    };

    #[test]
    fn reregistering_the_same_descriptor_is_a_noop() {
        let mut registry = StageRegistry::new();
        registry.register(&A).unwrap();
        registry.register(&A).unwrap();
        assert!(registry.contains("a"));
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        let mut registry = StageRegistry::new();
        registry.register(&A).unwrap();
        assert_matches!(
            registry.register(&A_CONFLICT),
            Err(ConfigError::ConflictingRegistration { name }) if name == "a"
        );
    }

    #[test]
    fn lookup_of_unregistered_stage_fails() {
        let registry = StageRegistry::new();
        assert_matches!(
            registry.get("ghost"),
            Err(ConfigError::UnregisteredStage { name }) if name == "ghost"
        );
    }

    #[test]
    fn builtins_are_registered() {
        let registry = builtin_registry();
        assert!(registry.contains("ingress"));
        assert!(registry.contains("power"));
        assert!(registry.contains("energy"));
    }
}
