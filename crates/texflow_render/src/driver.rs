//! Frame driver
//!
//! Owns every pipeline resource and runs the passes once per tick:
//!
//! ```text
//! collision (current -> force)
//! update    (current + force -> next), flip
//! render    (current -> screen)
//! show texture overlay (current -> screen)
//! ```
//!
//! The driver is `Idle` until a validated [`ProgramSet`] is installed.
//! Idle ticks submit nothing and report [`TickOutcome::NotReady`].

use crate::backend::GpuBackend;
use crate::error::PipelineError;
use crate::passes::{self, collision, render, update};
use crate::programs::ProgramSet;
use crate::quad::FullScreenQuad;
use crate::state::StateTextures;
use glam::{Mat4, Vec4};
use texflow_core::seed::initial_state;
use texflow_core::{BufferSlot, OutputMode, Population, SimulationClock, SimulationConfig};
use texflow_metrics::PassProfiler;

/// Number of frames averaged by the pass profiler.
const PROFILE_WINDOW: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Waiting for programs.
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Programs are not installed yet. Nothing was submitted.
    NotReady,
    Ran(FrameSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    pub mode: OutputMode,
    /// Authoritative slot after the tick.
    pub current: BufferSlot,
    pub flipped: bool,
    pub draw_calls: u32,
}

/// Lifetime totals, kept regardless of the `metrics` feature.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickCounters {
    pub ticks_run: u64,
    pub ticks_skipped: u64,
    pub flips: u64,
    pub draw_calls: u64,
}

pub struct FrameDriver<B: GpuBackend> {
    config: SimulationConfig,
    population: Population,
    state: StateTextures<B>,
    quad: FullScreenQuad<B>,
    uv_buffer: B::VertexBuffer,
    programs: Option<ProgramSet<B::Program>>,
    clock: SimulationClock,
    counters: TickCounters,
    profiler: PassProfiler,
}

impl<B: GpuBackend> FrameDriver<B> {
    /// Allocate state textures, framebuffers, the quad and the UV buffer.
    pub fn new(backend: &mut B, config: SimulationConfig) -> Result<Self, PipelineError> {
        let population = config.population()?;
        let state = StateTextures::allocate(backend, &population)?;
        let quad = FullScreenQuad::new(backend)?;
        let uv_buffer = backend.create_vertex_buffer("Particle UVs", &population.uv_coords(), 2)?;

        tracing::info!(
            backend = ?backend.backend_type(),
            particles = population.count(),
            width = population.extent().width,
            height = population.extent().height,
            mode = ?config.output_mode(),
            "frame driver initialized"
        );

        Ok(Self {
            clock: SimulationClock::new(config.timestep),
            config,
            population,
            state,
            quad,
            uv_buffer,
            programs: None,
            counters: TickCounters::default(),
            profiler: PassProfiler::new(PROFILE_WINDOW),
        })
    }

    pub fn state(&self) -> DriverState {
        if self.programs.is_some() {
            DriverState::Running
        } else {
            DriverState::Idle
        }
    }

    /// Validate and install programs, moving the driver to `Running`.
    pub fn install_programs(
        &mut self,
        programs: ProgramSet<B::Program>,
    ) -> Result<(), PipelineError> {
        programs.validate(&self.config)?;
        self.programs = Some(programs);
        tracing::info!("programs ready, driver running");
        if self.config.output_mode() == OutputMode::Paused {
            tracing::debug!("pingPong and showTexture are both off; simulation is paused");
        }
        Ok(())
    }

    /// Change the output flags between ticks.
    pub fn set_output_flags(
        &mut self,
        ping_pong: bool,
        show_texture: bool,
    ) -> Result<(), PipelineError> {
        if show_texture {
            if let Some(programs) = &self.programs {
                programs.display()?;
            }
        }
        self.config.ping_pong = ping_pong;
        self.config.show_texture = show_texture;
        tracing::info!(mode = ?self.config.output_mode(), "output mode changed");
        Ok(())
    }

    /// Upload explicit state into the current buffers.
    pub fn seed(
        &mut self,
        backend: &mut B,
        positions: &[Vec4],
        velocities: &[Vec4],
    ) -> Result<(), PipelineError> {
        self.state.seed(backend, positions, velocities)
    }

    /// Upload the initial state described by the config's layout and seed.
    pub fn seed_from_config(&mut self, backend: &mut B) -> Result<(), PipelineError> {
        let (positions, velocities) =
            initial_state(&self.population, self.config.layout, self.config.seed);
        self.seed(backend, &positions, &velocities)
    }

    /// Run one frame.
    pub fn tick(&mut self, backend: &mut B, camera: &Mat4) -> Result<TickOutcome, PipelineError> {
        let Some(programs) = self.programs.as_ref() else {
            self.counters.ticks_skipped += 1;
            tracing::debug!("waiting for programs to load...");
            return Ok(TickOutcome::NotReady);
        };

        let mode = self.config.output_mode();
        let timestep = self.config.timestep;
        let clear_color = self.config.clear_color;
        let mut draw_calls = 0;
        let mut flipped = false;

        backend.begin_frame()?;

        if mode.advances() {
            self.profiler.time(passes::COLLISION, || {
                collision::execute(
                    backend,
                    &self.quad,
                    &programs.collision,
                    &self.state,
                    &self.population,
                )
            })?;
            draw_calls += 1;

            self.profiler.time(passes::UPDATE, || {
                update::advance(
                    backend,
                    &self.quad,
                    &programs.update,
                    &mut self.state,
                    timestep,
                )
            })?;
            draw_calls += 1;
            flipped = true;
        } else {
            tracing::trace!(?mode, "update pass produces no state write this tick");
        }

        self.profiler.time(passes::RENDER, || {
            render::execute(
                backend,
                &programs.particle,
                &self.state,
                &self.uv_buffer,
                &self.population,
                camera,
                clear_color,
            )
        })?;
        draw_calls += 1;

        if mode.inspects() {
            let display = programs.display()?;
            self.profiler.time(passes::SHOW_TEXTURE, || {
                update::show_texture(backend, &self.quad, display, &self.state)
            })?;
            draw_calls += 1;
        }

        backend.end_frame()?;

        self.clock.record_tick(flipped);
        self.counters.ticks_run += 1;
        self.counters.draw_calls += u64::from(draw_calls);
        if flipped {
            self.counters.flips += 1;
        }

        Ok(TickOutcome::Ran(FrameSummary {
            mode,
            current: self.state.current_slot(),
            flipped,
            draw_calls,
        }))
    }

    /// Blocking readback of the current positions.
    pub fn positions(&self, backend: &mut B) -> Result<Vec<Vec4>, PipelineError> {
        backend.read_texture(&self.state.current().position)
    }

    /// Blocking readback of the current velocities.
    pub fn velocities(&self, backend: &mut B) -> Result<Vec<Vec4>, PipelineError> {
        backend.read_texture(&self.state.current().velocity)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn current_slot(&self) -> BufferSlot {
        self.state.current_slot()
    }

    pub fn textures(&self) -> &StateTextures<B> {
        &self.state
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn counters(&self) -> TickCounters {
        self.counters
    }

    pub fn profiler(&self) -> &PassProfiler {
        &self.profiler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{TextureHandle, Topology};
    use crate::programs::{slots, ProgramSet};
    use crate::software::kernels::{ConstantForce, PairwiseRepulsion, TexelKernel};
    use crate::software::{reference_programs, RecordedTarget, SoftProgram, SoftwareBackend};

    fn config(count: u32, width: u32, height: u32) -> SimulationConfig {
        SimulationConfig {
            particle_count: count,
            texture_width: width,
            texture_height: height,
            ..Default::default()
        }
    }

    fn running(
        config: SimulationConfig,
        force: impl TexelKernel + 'static,
    ) -> (SoftwareBackend, FrameDriver<SoftwareBackend>) {
        let mut backend = SoftwareBackend::new();
        let mut driver = FrameDriver::new(&mut backend, config).unwrap();
        driver.seed_from_config(&mut backend).unwrap();
        driver.install_programs(reference_programs(force)).unwrap();
        (backend, driver)
    }

    fn labels(backend: &SoftwareBackend) -> Vec<&str> {
        backend.log().iter().map(|r| r.program.as_str()).collect()
    }

    #[test]
    fn constant_force_step() {
        let config = SimulationConfig {
            timestep: 1.0,
            ..config(4, 2, 2)
        };
        let gravity = ConstantForce(Vec4::new(0.0, -1.0, 0.0, 0.0));
        let (mut backend, mut driver) = running(config, gravity);
        let positions = [
            Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 1.0, 0.0, 1.0),
            Vec4::new(1.0, 1.0, 0.0, 1.0),
        ];
        driver.seed(&mut backend, &positions, &[Vec4::ZERO; 4]).unwrap();
        assert_eq!(driver.current_slot(), BufferSlot::A);

        let outcome = driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();

        assert!(matches!(
            outcome,
            TickOutcome::Ran(FrameSummary {
                current: BufferSlot::B,
                flipped: true,
                draw_calls: 3,
                ..
            })
        ));
        assert_eq!(
            driver.positions(&mut backend).unwrap(),
            vec![
                Vec4::new(0.0, -1.0, 0.0, 1.0),
                Vec4::new(1.0, -1.0, 0.0, 1.0),
                Vec4::new(0.0, 0.0, 0.0, 1.0),
                Vec4::new(1.0, 0.0, 0.0, 1.0),
            ]
        );
        assert_eq!(
            driver.velocities(&mut backend).unwrap(),
            vec![Vec4::new(0.0, -1.0, 0.0, 0.0); 4]
        );
        assert_eq!(driver.clock().step_count(), 1);
    }

    #[test]
    fn not_ready_tick_submits_nothing() {
        let mut backend = SoftwareBackend::new();
        let mut driver = FrameDriver::new(&mut backend, config(16, 4, 4)).unwrap();
        assert_eq!(driver.state(), DriverState::Idle);

        let outcome = driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();

        assert_eq!(outcome, TickOutcome::NotReady);
        assert!(backend.log().is_empty());
        assert_eq!(backend.frames_presented(), 0);
        assert_eq!(driver.current_slot(), BufferSlot::A);
        assert_eq!(driver.counters().ticks_skipped, 1);
        assert_eq!(driver.clock().tick_count(), 0);
    }

    #[test]
    fn passes_run_in_order() {
        let config = SimulationConfig {
            show_texture: true,
            ..config(16, 4, 4)
        };
        let (mut backend, mut driver) = running(config, PairwiseRepulsion::default());

        driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();

        assert_eq!(labels(&backend), ["collision", "update", "particle", "display"]);
        let log = backend.log();
        assert_eq!(log[0].target, RecordedTarget::Offscreen("Force Target".into()));
        assert_eq!(log[2].target, RecordedTarget::Screen { cleared: true });
        assert_eq!(log[3].target, RecordedTarget::Screen { cleared: false });
        assert!(log.iter().all(|r| r.frame == 1));
        assert_eq!(backend.frames_presented(), 1);
    }

    #[test]
    fn no_draw_reads_what_it_writes() {
        let config = SimulationConfig {
            show_texture: true,
            ..config(64, 8, 8)
        };
        let (mut backend, mut driver) = running(config, PairwiseRepulsion::default());
        for _ in 0..4 {
            driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
        }
        for record in backend.log() {
            assert!(
                record.reads.iter().all(|id| !record.writes.contains(id)),
                "{record:?}"
            );
        }
    }

    #[test]
    fn buffers_alternate_between_ticks() {
        let (mut backend, mut driver) = running(config(16, 4, 4), PairwiseRepulsion::default());
        let mut expected = BufferSlot::A;

        for _ in 0..5 {
            let before = driver.textures().current().position.id();
            let written = driver.textures().next().position.id();
            assert_ne!(before, written);

            driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
            expected = expected.other();

            assert_eq!(driver.current_slot(), expected);
            assert_eq!(driver.textures().current().position.id(), written);
            let update = &backend.log()[backend.log().len() - 2];
            assert_eq!(update.program, "update");
            assert!(update.reads.contains(&before));
            assert!(update.writes.contains(&written));
            // Render samples the freshly written state.
            let render = backend.log().last().unwrap();
            assert_eq!(render.reads, vec![written]);
        }
        assert_eq!(driver.counters().flips, 5);
    }

    #[test]
    fn identical_runs_are_identical() {
        let run = |poison: bool| {
            let (mut backend, mut driver) = running(config(64, 8, 8), PairwiseRepulsion::default());
            if poison {
                let force = driver.textures().force();
                backend.write_texture(force, &[Vec4::splat(1.0e9); 64]).unwrap();
            }
            for _ in 0..6 {
                driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
            }
            (
                driver.positions(&mut backend).unwrap(),
                driver.velocities(&mut backend).unwrap(),
            )
        };

        let clean = run(false);
        assert_eq!(clean, run(false));
        assert_eq!(clean, run(true));
    }

    #[test]
    fn one_point_per_particle() {
        for count in [1, 64, 100] {
            let (mut backend, mut driver) =
                running(config(count, 10, 10), PairwiseRepulsion::default());
            driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();

            let render = backend.log().last().unwrap();
            assert_eq!(render.topology, Topology::Points);
            assert_eq!(render.vertex_count, count);
            assert_eq!(backend.last_frame().unwrap().points.len(), count as usize);
        }
    }

    #[test]
    fn show_texture_only_leaves_state_alone() {
        let config = SimulationConfig {
            ping_pong: false,
            show_texture: true,
            ..config(16, 4, 4)
        };
        let (mut backend, mut driver) = running(config, PairwiseRepulsion::default());
        let before = driver.positions(&mut backend).unwrap();

        for tick in 1..=3 {
            backend.clear_log();
            let outcome = driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();

            assert!(matches!(
                outcome,
                TickOutcome::Ran(FrameSummary {
                    mode: OutputMode::Inspect,
                    current: BufferSlot::A,
                    flipped: false,
                    ..
                })
            ));
            assert_eq!(labels(&backend), ["particle", "display"]);
            assert_eq!(backend.frames_presented(), tick);
            let frame = backend.last_frame().unwrap();
            assert!(frame.image.is_some());
            assert_eq!(frame.points.len(), 16);
        }
        assert_eq!(driver.positions(&mut backend).unwrap(), before);
    }

    #[test]
    fn paused_still_renders() {
        let config = SimulationConfig {
            ping_pong: false,
            show_texture: false,
            ..config(16, 4, 4)
        };
        let (mut backend, mut driver) = running(config, PairwiseRepulsion::default());
        for _ in 0..3 {
            driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
        }
        assert_eq!(labels(&backend), ["particle", "particle", "particle"]);
        assert_eq!(driver.current_slot(), BufferSlot::A);
        assert_eq!(driver.clock().tick_count(), 3);
        assert_eq!(driver.clock().step_count(), 0);
    }

    #[test]
    fn toggling_ping_pong_between_ticks() {
        let (mut backend, mut driver) = running(config(16, 4, 4), PairwiseRepulsion::default());
        driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
        assert_eq!(driver.current_slot(), BufferSlot::B);

        driver.set_output_flags(false, false).unwrap();
        driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
        assert_eq!(driver.current_slot(), BufferSlot::B);

        driver.set_output_flags(true, false).unwrap();
        driver.tick(&mut backend, &Mat4::IDENTITY).unwrap();
        assert_eq!(driver.current_slot(), BufferSlot::A);
    }

    #[test]
    fn programs_missing_slots_are_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut driver = FrameDriver::new(&mut backend, config(16, 4, 4)).unwrap();
        let mut programs = reference_programs(PairwiseRepulsion::default());
        programs.update = SoftProgram::new(
            "update",
            crate::software::ProgramStage::Fragment(std::sync::Arc::new(
                crate::software::kernels::EulerIntegrator,
            )),
        )
        .with_attribute(slots::POSITION)
        .with_uniform(slots::POS_TEX)
        .with_uniform(slots::VEL_TEX)
        .with_uniform(slots::TIMESTEP);

        assert!(matches!(
            driver.install_programs(programs),
            Err(PipelineError::MissingUniform { slot: "forceTex", .. })
        ));
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(
            driver.tick(&mut backend, &Mat4::IDENTITY).unwrap(),
            TickOutcome::NotReady
        );
    }

    #[test]
    fn show_texture_needs_a_display_program() {
        let mut backend = SoftwareBackend::new();
        let mut driver = FrameDriver::new(&mut backend, config(16, 4, 4)).unwrap();
        let programs = ProgramSet {
            display: None,
            ..reference_programs(PairwiseRepulsion::default())
        };
        driver.install_programs(programs).unwrap();

        assert!(matches!(
            driver.set_output_flags(true, true),
            Err(PipelineError::MissingProgram { role: "display" })
        ));
        assert!(!driver.config().show_texture);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut backend = SoftwareBackend::new();
        assert!(matches!(
            FrameDriver::new(&mut backend, config(17, 4, 4)).err(),
            Some(PipelineError::Config(_))
        ));
    }
}
