//! Interactive window: side and front projections of the backbone plus a
//! plot of the end-effector position.
//!
//! Controls depend on the scenario, see the key list in the top panel.
//! Space pauses, `m` cycles the scenario, Backspace resets, Escape quits.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use control::{EventQueue, LoopConfig, MainLoop, TickClock};
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use log::info;
use nalgebra::{Point3, Vector3};
use simcore::{
    BackbonePoses, ContractViolation, EventHandler, Key, KinematicModel, LoopEvent, LoopState,
    Pose, Renderer, ScenarioMode, SkeletonGeometry, SurfaceHandle,
};

use crate::config::ViewerConfig;

const PROJECTION_HEIGHT: f32 = 420.0;

/// Renderer backing the window. Holds whatever the main loop last pushed.
pub struct SceneRenderer {
    title: String,
    size: [u32; 2],
    scenario: ScenarioMode,
    skeleton: SkeletonGeometry,
    disks: Option<BackbonePoses>,
    frames: u64,
}

impl SceneRenderer {
    pub fn new(title: &str, size: [f32; 2]) -> Self {
        SceneRenderer {
            title: title.to_string(),
            size: [size[0] as u32, size[1] as u32],
            scenario: ScenarioMode::Default,
            skeleton: SkeletonGeometry::default(),
            disks: None,
            frames: 0,
        }
    }

    fn tip(&self) -> Option<Point3<f64>> {
        self.disks
            .as_ref()
            .map(|d| Point3::from(d.end_effector().translation.vector))
    }
}

impl Renderer for SceneRenderer {
    fn init_scene(&mut self, mode: ScenarioMode) {
        self.scenario = mode;
        self.disks = None;
    }

    fn draw_skeleton(&mut self, skeleton: &SkeletonGeometry) {
        self.skeleton = skeleton.clone();
    }

    fn update_pose(&mut self, disks: BackbonePoses) {
        self.disks = Some(disks);
        self.frames += 1;
    }

    fn surface_handle(&self) -> SurfaceHandle {
        SurfaceHandle {
            title: self.title.clone(),
            size: self.size,
        }
    }
}

struct Trace {
    t: VecDeque<f64>,
    x: VecDeque<f64>,
    y: VecDeque<f64>,
    z: VecDeque<f64>,
    capacity: usize,
}

impl Trace {
    fn new(seconds: f64, sample_dt: f64) -> Self {
        let capacity = (seconds / sample_dt).ceil() as usize + 1;
        Self {
            t: VecDeque::with_capacity(capacity),
            x: VecDeque::with_capacity(capacity),
            y: VecDeque::with_capacity(capacity),
            z: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, t: f64, tip: Point3<f64>) {
        self.t.push_back(t);
        self.x.push_back(tip.x);
        self.y.push_back(tip.y);
        self.z.push_back(tip.z);
        while self.t.len() > self.capacity {
            self.t.pop_front();
            self.x.pop_front();
            self.y.pop_front();
            self.z.pop_front();
        }
    }

    fn line<'a>(values: &'a VecDeque<f64>, t: &'a VecDeque<f64>) -> PlotPoints<'a> {
        PlotPoints::from_iter(t.iter().copied().zip(values.iter().copied()).map(|(x, y)| [x, y]))
    }
}

/// Which plane a projection shows against the base z-axis.
#[derive(Clone, Copy)]
enum Projection {
    Side,
    Front,
}

impl Projection {
    fn label(self) -> &'static str {
        match self {
            Projection::Side => "side (x-z)",
            Projection::Front => "front (y-z)",
        }
    }

    fn horizontal(self, p: &Point3<f64>) -> f64 {
        match self {
            Projection::Side => p.x,
            Projection::Front => p.y,
        }
    }

    /// Local disk axis lying in the projection plane.
    fn disk_axis(self) -> Vector3<f64> {
        match self {
            Projection::Side => Vector3::x(),
            Projection::Front => Vector3::y(),
        }
    }
}

pub struct ViewerApp<'m> {
    main_loop: MainLoop<'m, SceneRenderer>,
    queue: EventQueue,
    clock: TickClock,
    last_frame: Instant,
    last_rendered: u64,
    trace: Trace,
    scale: f32,
}

impl<'m> ViewerApp<'m> {
    pub fn new(
        model: &'m dyn KinematicModel,
        loop_config: LoopConfig,
        viewer: &ViewerConfig,
    ) -> Result<Self, ContractViolation> {
        let renderer = SceneRenderer::new(model.name(), viewer.window_size);
        let mut main_loop = MainLoop::new(model, renderer, loop_config)?;
        let clock = TickClock::new(loop_config.timestep_seconds)?;
        main_loop.start();

        Ok(ViewerApp {
            main_loop,
            queue: EventQueue::new(),
            clock,
            last_frame: Instant::now(),
            last_rendered: 0,
            trace: Trace::new(viewer.trace_seconds, loop_config.timestep_seconds),
            scale: viewer.scale_px_per_m,
        })
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        ctx.input(|i| {
            for event in &i.events {
                if let egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    ..
                } = event
                {
                    self.queue.push(LoopEvent::KeyPress(Key::from(key.name())));
                }
            }
            if i.viewport().close_requested() {
                self.queue.push(LoopEvent::Shutdown);
            }
        });
    }

    fn step(&mut self) {
        let now = Instant::now();
        let ticks = self.clock.advance(now.duration_since(self.last_frame));
        self.last_frame = now;
        self.queue.extend((0..ticks).map(|_| LoopEvent::TimerTick));
        self.queue.dispatch_all(&mut self.main_loop);

        if self.main_loop.is_stopped() {
            self.clock.stop();
        }

        let renderer = self.main_loop.renderer();
        if renderer.frames != self.last_rendered {
            self.last_rendered = renderer.frames;
            if let Some(tip) = renderer.tip() {
                self.trace.push(self.main_loop.context().t, tip);
            }
        }
    }

    fn draw_projection(&self, ui: &mut egui::Ui, projection: Projection, width: f32) {
        let desired = egui::vec2(width, PROJECTION_HEIGHT);
        let (response, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);

        let origin = egui::pos2(rect.center().x, rect.bottom() - 30.0);
        let scale = self.scale;
        let to_screen = |h: f64, z: f64| -> egui::Pos2 {
            egui::pos2(origin.x + h as f32 * scale, origin.y - z as f32 * scale)
        };

        // Base frame
        painter.line_segment([origin, to_screen(0.02, 0.0)], egui::Stroke::new(2.0, egui::Color32::RED));
        painter.line_segment([origin, to_screen(0.0, 0.02)], egui::Stroke::new(2.0, egui::Color32::BLUE));
        painter.text(
            rect.left_top() + egui::vec2(8.0, 8.0),
            egui::Align2::LEFT_TOP,
            format!("{}  [{}]", projection.label(), self.main_loop.renderer().scenario.label()),
            egui::FontId::monospace(12.0),
            ui.visuals().text_color(),
        );

        let renderer = self.main_loop.renderer();
        let Some(disks) = renderer.disks.as_ref() else {
            return;
        };
        let skeleton = &renderer.skeleton;

        // Backbone
        let backbone: Vec<egui::Pos2> = disks
            .iter()
            .map(|pose| {
                let p = Point3::from(pose.translation.vector);
                to_screen(projection.horizontal(&p), p.z)
            })
            .collect();
        let backbone_width = (2.0 * skeleton.outer_radius as f32 * scale).max(2.0);
        painter.add(egui::Shape::line(
            backbone,
            egui::Stroke::new(backbone_width, egui::Color32::LIGHT_GRAY),
        ));

        // Tendons of segment k run through every disk up to the end of segment k
        let axis = projection.disk_axis();
        let mut routed: Vec<&[Pose]> = Vec::new();
        for (k, segment) in disks.segments().enumerate() {
            routed.push(segment);
            let Some(&pitch) = skeleton.pitch_radii.get(k) else {
                continue;
            };
            for side in [1.0, -1.0] {
                let path: Vec<egui::Pos2> = routed
                    .iter()
                    .flat_map(|poses| poses.iter())
                    .map(|pose| {
                        let p = pose * Point3::from(axis * (side * pitch));
                        to_screen(projection.horizontal(&p), p.z)
                    })
                    .collect();
                painter.add(egui::Shape::line(
                    path,
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(230, 160, 60)),
                ));
            }
        }

        // Spacer disks
        if skeleton.disk_radius > 0.0 {
            let stroke = egui::Stroke::new(
                (skeleton.disk_height as f32 * scale).max(2.0),
                egui::Color32::from_rgb(120, 170, 255),
            );
            for pose in disks.iter() {
                let a = pose * Point3::from(axis * skeleton.disk_radius);
                let b = pose * Point3::from(axis * -skeleton.disk_radius);
                painter.line_segment(
                    [to_screen(projection.horizontal(&a), a.z), to_screen(projection.horizontal(&b), b.z)],
                    stroke,
                );
            }
        }

        let tip = disks.end_effector();
        let p = Point3::from(tip.translation.vector);
        painter.circle_filled(to_screen(projection.horizontal(&p), p.z), 4.0, egui::Color32::YELLOW);
    }
}

impl eframe::App for ViewerApp<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard(ctx);
        self.step();

        if self.main_loop.is_stopped() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            let paused = self.main_loop.run_state() == LoopState::Paused;
            ui.horizontal_wrapped(|ui| {
                if ui.button(if paused { "Resume" } else { "Pause" }).clicked() {
                    self.queue.push(LoopEvent::KeyPress(Key::Space));
                }
                if ui.button("Reset").clicked() {
                    self.queue.push(LoopEvent::KeyPress(Key::Backspace));
                }
                if ui.button("Next scenario").clicked() {
                    self.queue.push(LoopEvent::KeyPress(Key::Char('m')));
                }

                ui.separator();
                let state = self.main_loop.state();
                ui.label(format!("{:?} | scenario {}", self.main_loop.run_state(), state.scenario));
                let q: Vec<String> = state.actuation.iter().map(|v| format!("{:+.4}", v)).collect();
                ui.label(format!("q = [{}]", q.join(", ")));

                ui.separator();
                let stats = self.main_loop.stats();
                ui.label(format!(
                    "ticks {}  renders {}  failures {}",
                    stats.ticks, stats.renders, stats.failures
                ));
            });
            match self.main_loop.last_failure() {
                Some(failure) => {
                    ui.colored_label(egui::Color32::RED, format!("Infeasible: {}", failure));
                }
                None => {
                    ui.colored_label(egui::Color32::GREEN, "Feasible");
                }
            }
            let bindings: Vec<String> = self
                .main_loop
                .keymap()
                .describe()
                .into_iter()
                .map(|(key, command)| format!("{}: {:?}", key, command))
                .collect();
            ui.collapsing("Key bindings", |ui| {
                for line in bindings {
                    ui.monospace(line);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add(egui::Slider::new(&mut self.scale, 200.0..=5000.0).prefix("Zoom: ").suffix(" px/m"));
            });
            let width = (ui.available_width() - ui.spacing().item_spacing.x) / 2.0;
            ui.horizontal(|ui| {
                self.draw_projection(ui, Projection::Side, width);
                self.draw_projection(ui, Projection::Front, width);
            });

            ui.separator();
            ui.heading("End-effector position (m)");
            Plot::new("tip_plot")
                .legend(Legend::default())
                .allow_scroll(false)
                .height(200.0)
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new("x", Trace::line(&self.trace.x, &self.trace.t)));
                    plot_ui.line(Line::new("y", Trace::line(&self.trace.y, &self.trace.t)));
                    plot_ui.line(Line::new("z", Trace::line(&self.trace.z, &self.trace.t)));
                });
        });

        ctx.request_repaint_after(self.clock.until_next().min(Duration::from_millis(10)));
    }
}

/// Open the window and run until it closes.
pub fn run(
    model: &dyn KinematicModel,
    loop_config: LoopConfig,
    viewer: &ViewerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = ViewerApp::new(model, loop_config, viewer)?;
    let handle = app.main_loop.renderer().surface_handle();
    info!("opening viewer for {}", handle.title);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([handle.size[0] as f32, handle.size[1] as f32])
            .with_title(handle.title.as_str()),
        ..Default::default()
    };
    eframe::run_native(
        &handle.title,
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )?;
    Ok(())
}
