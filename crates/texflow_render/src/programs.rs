//! Program roles and their required slots
//!
//! Programs arrive from outside the pipeline already linked. Before the
//! driver starts running it checks that every slot a pass binds exists;
//! a missing slot is a setup error, not something to discover mid-frame.

use crate::backend::ProgramSlots;
use crate::error::PipelineError;
use texflow_core::SimulationConfig;

/// Attribute and uniform slot names.
pub mod slots {
    pub const POSITION: &str = "position";
    pub const UV: &str = "uv";

    pub const CAMERA_MAT: &str = "cameraMat";
    pub const POS_TEX: &str = "posTex";
    pub const VEL_TEX: &str = "velTex";
    pub const FORCE_TEX: &str = "forceTex";
    pub const TIMESTEP: &str = "timestep";
    pub const PARTICLE_COUNT: &str = "particleCount";
}

/// Slots a program must expose to fill a role.
pub struct RoleSlots {
    pub role: &'static str,
    pub attributes: &'static [&'static str],
    pub uniforms: &'static [&'static str],
}

pub const COLLISION: RoleSlots = RoleSlots {
    role: "collision",
    attributes: &[slots::POSITION],
    uniforms: &[slots::POS_TEX, slots::VEL_TEX, slots::PARTICLE_COUNT],
};

pub const UPDATE: RoleSlots = RoleSlots {
    role: "update",
    attributes: &[slots::POSITION],
    uniforms: &[slots::POS_TEX, slots::VEL_TEX, slots::FORCE_TEX, slots::TIMESTEP],
};

pub const PARTICLE: RoleSlots = RoleSlots {
    role: "particle",
    attributes: &[slots::UV],
    uniforms: &[slots::CAMERA_MAT, slots::POS_TEX],
};

pub const DISPLAY: RoleSlots = RoleSlots {
    role: "display",
    attributes: &[slots::POSITION],
    uniforms: &[slots::POS_TEX],
};

impl RoleSlots {
    pub fn check<P: ProgramSlots>(&self, program: &P) -> Result<(), PipelineError> {
        for &slot in self.attributes {
            if !program.has_attribute(slot) {
                return Err(PipelineError::MissingAttribute {
                    program: program.label().to_string(),
                    slot,
                });
            }
        }
        for &slot in self.uniforms {
            if !program.has_uniform(slot) {
                return Err(PipelineError::MissingUniform {
                    program: program.label().to_string(),
                    slot,
                });
            }
        }
        Ok(())
    }
}

/// Every program the pipeline draws with.
pub struct ProgramSet<P> {
    pub collision: P,
    pub update: P,
    pub particle: P,
    /// Raw-texture view; only needed when `showTexture` is enabled.
    pub display: Option<P>,
}

impl<P: ProgramSlots> ProgramSet<P> {
    pub fn validate(&self, config: &SimulationConfig) -> Result<(), PipelineError> {
        COLLISION.check(&self.collision)?;
        UPDATE.check(&self.update)?;
        PARTICLE.check(&self.particle)?;
        match (&self.display, config.show_texture) {
            (Some(display), _) => DISPLAY.check(display),
            (None, true) => Err(PipelineError::MissingProgram {
                role: DISPLAY.role,
            }),
            (None, false) => Ok(()),
        }
    }

    /// The display program. Present whenever validation passed with `showTexture` on.
    pub fn display(&self) -> Result<&P, PipelineError> {
        self.display.as_ref().ok_or(PipelineError::MissingProgram {
            role: DISPLAY.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        label: &'static str,
        attributes: Vec<&'static str>,
        uniforms: Vec<&'static str>,
    }

    impl Stub {
        fn for_role(role: &RoleSlots) -> Self {
            Self {
                label: role.role,
                attributes: role.attributes.to_vec(),
                uniforms: role.uniforms.to_vec(),
            }
        }
    }

    impl ProgramSlots for Stub {
        fn label(&self) -> &str {
            self.label
        }
        fn has_attribute(&self, name: &str) -> bool {
            self.attributes.contains(&name)
        }
        fn has_uniform(&self, name: &str) -> bool {
            self.uniforms.contains(&name)
        }
    }

    fn full_set() -> ProgramSet<Stub> {
        ProgramSet {
            collision: Stub::for_role(&COLLISION),
            update: Stub::for_role(&UPDATE),
            particle: Stub::for_role(&PARTICLE),
            display: None,
        }
    }

    #[test]
    fn complete_set_validates() {
        full_set().validate(&SimulationConfig::default()).unwrap();
    }

    #[test]
    fn missing_uniform_is_reported() {
        let mut set = full_set();
        set.update.uniforms.retain(|u| *u != slots::FORCE_TEX);
        match set.validate(&SimulationConfig::default()) {
            Err(PipelineError::MissingUniform { program, slot }) => {
                assert_eq!(program, "update");
                assert_eq!(slot, slots::FORCE_TEX);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_attribute_is_reported() {
        let mut set = full_set();
        set.particle.attributes.clear();
        assert!(matches!(
            set.validate(&SimulationConfig::default()),
            Err(PipelineError::MissingAttribute { slot: "uv", .. })
        ));
    }

    #[test]
    fn display_required_only_for_show_texture() {
        let config = SimulationConfig {
            show_texture: true,
            ..Default::default()
        };
        let mut set = full_set();
        assert!(matches!(
            set.validate(&config),
            Err(PipelineError::MissingProgram { role: "display" })
        ));
        set.display = Some(Stub::for_role(&DISPLAY));
        set.validate(&config).unwrap();
    }
}
