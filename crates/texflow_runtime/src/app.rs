//! Application loop
//!
//! Owns the window, the wgpu backend and the frame driver, and ticks the
//! driver once per redraw.

use crate::camera::OrbitCamera;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use texflow_core::SimulationConfig;
use texflow_metrics::FrameTimer;
use texflow_render::window::{window_attributes, WindowConfig};
use texflow_render::{FrameDriver, TickOutcome, WgpuBackend};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

const METRICS_INTERVAL: Duration = Duration::from_secs(2);

struct Gpu {
    window: Arc<Window>,
    backend: WgpuBackend,
    driver: FrameDriver<WgpuBackend>,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, config: SimulationConfig) -> Result<Self> {
        let attrs = window_attributes(&WindowConfig::default());
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let mut backend = pollster::block_on(WgpuBackend::new(window.clone()))?;
        let mut driver = FrameDriver::new(&mut backend, config)?;
        driver.seed_from_config(&mut backend)?;
        driver.install_programs(backend.create_programs())?;

        Ok(Self {
            window,
            backend,
            driver,
        })
    }
}

pub struct App {
    config: SimulationConfig,
    gpu: Option<Gpu>,
    camera: OrbitCamera,
    frame_timer: FrameTimer,
    last_frame: Instant,
    last_print: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            gpu: None,
            camera: OrbitCamera::new(16.0 / 9.0),
            frame_timer: FrameTimer::new(120),
            last_frame: Instant::now(),
            last_print: Instant::now(),
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_timer.begin();
        self.camera.advance(dt);
        let result = gpu
            .driver
            .tick(&mut gpu.backend, &self.camera.view_projection());
        self.frame_timer.end();

        match result {
            Ok(TickOutcome::Ran(_)) => {}
            Ok(TickOutcome::NotReady) => {
                tracing::debug!("waiting for programs to load...");
            }
            Err(error) if error.is_recoverable() => {
                tracing::warn!(%error, "reconfiguring surface");
                gpu.backend.reconfigure();
            }
            Err(error) => {
                self.fail(event_loop, error.into());
                return;
            }
        }

        if self.last_print.elapsed() >= METRICS_INTERVAL {
            self.last_print = Instant::now();
            self.log_metrics();
        }
    }

    fn log_metrics(&self) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        let (min_ms, max_ms) = self.frame_timer.frame_time_range_ms();
        let counters = gpu.driver.counters();
        tracing::info!(
            frames = self.frame_timer.frame_count(),
            fps = self.frame_timer.fps(),
            frame_ms = self.frame_timer.frame_time_ms(),
            min_ms,
            max_ms,
            ticks = counters.ticks_run,
            flips = counters.flips,
            draws = counters.draw_calls,
            sim_time = ?gpu.driver.clock().simulated_time(),
            "frame metrics"
        );
        let profiler = gpu.driver.profiler();
        for pass in profiler.passes() {
            tracing::info!(
                pass,
                avg_ms = profiler.average_ms(pass),
                "pass timing"
            );
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let config = gpu.driver.config();
        let (ping_pong, show_texture) = (config.ping_pong, config.show_texture);

        let result = match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) => {
                event_loop.exit();
                return;
            }
            Key::Named(NamedKey::Space) | Key::Character("p") => {
                gpu.driver.set_output_flags(!ping_pong, show_texture)
            }
            Key::Character("t") => gpu.driver.set_output_flags(ping_pong, !show_texture),
            _ => return,
        };
        if let Err(error) = result {
            tracing::warn!(%error, "output mode unchanged");
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, self.config.clone()) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.camera.set_aspect(size.width, size.height);
                self.last_frame = Instant::now();
                self.gpu = Some(gpu);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.backend.resize(size.width, size.height);
                }
                self.camera.set_aspect(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}
