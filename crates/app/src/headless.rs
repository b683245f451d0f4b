//! Scripted runs without a window

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use control::{EventQueue, LoopConfig, LoopStats, MainLoop};
use log::{debug, info};
use nalgebra::Point3;
use simcore::{
    BackbonePoses, ContractViolation, Key, KinematicModel, LoopEvent, Renderer, ScenarioMode,
    SkeletonGeometry, SurfaceHandle,
};

/// Renderer that records the end-effector of every frame it receives.
#[derive(Debug, Default)]
pub struct TraceRenderer {
    scenario: Option<ScenarioMode>,
    skeleton: Option<SkeletonGeometry>,
    tips: Vec<Point3<f64>>,
}

impl TraceRenderer {
    pub fn tips(&self) -> &[Point3<f64>] {
        &self.tips
    }

    pub fn scenario(&self) -> Option<ScenarioMode> {
        self.scenario
    }

    pub fn skeleton(&self) -> Option<&SkeletonGeometry> {
        self.skeleton.as_ref()
    }

    /// One row per frame: `frame,x,y,z`.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "frame,x,y,z")?;
        for (frame, tip) in self.tips.iter().enumerate() {
            writeln!(out, "{},{:.9},{:.9},{:.9}", frame, tip.x, tip.y, tip.z)?;
        }
        Ok(())
    }
}

impl Renderer for TraceRenderer {
    fn init_scene(&mut self, mode: ScenarioMode) {
        debug!("scene initialised for {}", mode);
        self.scenario = Some(mode);
    }

    fn draw_skeleton(&mut self, skeleton: &SkeletonGeometry) {
        self.skeleton = Some(skeleton.clone());
    }

    fn update_pose(&mut self, disks: BackbonePoses) {
        let tip = Point3::from(disks.end_effector().translation.vector);
        info!(
            "frame {:>4}: tip = ({:+.5}, {:+.5}, {:+.5}) m over {} disks",
            self.tips.len(),
            tip.x,
            tip.y,
            tip.z,
            disks.len()
        );
        self.tips.push(tip);
    }

    fn surface_handle(&self) -> SurfaceHandle {
        SurfaceHandle {
            title: "headless".to_string(),
            size: [0, 0],
        }
    }
}

/// Deliver the scripted `keys`, then `ticks` timer ticks and a shutdown.
pub fn run(
    model: &dyn KinematicModel,
    config: LoopConfig,
    keys: &[String],
    ticks: u32,
) -> Result<(TraceRenderer, LoopStats), ContractViolation> {
    let mut main_loop = MainLoop::new(model, TraceRenderer::default(), config)?;
    main_loop.start();

    let mut queue = EventQueue::new();
    queue.extend(keys.iter().map(|k| LoopEvent::KeyPress(Key::from(k.as_str()))));
    queue.extend((0..ticks).map(|_| LoopEvent::TimerTick));
    queue.push(LoopEvent::Shutdown);
    let delivered = queue.dispatch_all(&mut main_loop);
    debug!("delivered {} events", delivered);

    let stats = main_loop.stats();
    if let Some(failure) = main_loop.last_failure() {
        info!("last evaluation failed: {}", failure);
    }
    Ok((main_loop.into_renderer(), stats))
}

pub fn write_trace(renderer: &TraceRenderer, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    renderer.write_csv(io::BufWriter::new(file))?;
    info!("wrote {} frames to {}", renderer.tips().len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mechanics::{ConcentricTubeModel, CtcrConfig, TdcrConfig, TendonDrivenModel};

    #[test]
    fn test_scripted_keys_bend_the_robot() {
        let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
        let keys: Vec<String> = ["1", "1", "1"].iter().map(|k| k.to_string()).collect();
        let (renderer, stats) = run(&model, LoopConfig::default(), &keys, 3).unwrap();

        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.renders, 4);
        assert_eq!(renderer.scenario(), Some(ScenarioMode::Default));
        assert_relative_eq!(renderer.tips()[0].z, 0.2, epsilon = 1e-12);
        assert!(renderer.tips()[1].x > 0.0);
    }

    #[test]
    fn test_ctcr_run() {
        let model = ConcentricTubeModel::new(CtcrConfig::default()).unwrap();
        let (renderer, stats) = run(&model, LoopConfig::default(), &[], 2).unwrap();
        assert_eq!(stats.renders, 3);
        assert_eq!(renderer.skeleton().map(|s| s.pitch_radii.len()), Some(3));
    }

    #[test]
    fn test_quit_key_ends_run_early() {
        let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
        let keys = vec!["escape".to_string()];
        let (renderer, stats) = run(&model, LoopConfig::default(), &keys, 5).unwrap();
        assert_eq!(stats.ticks, 0);
        assert_eq!(renderer.tips().len(), 1);
    }

    #[test]
    fn test_csv_layout() {
        let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
        let (renderer, _) = run(&model, LoopConfig::default(), &[], 1).unwrap();

        let mut buffer = Vec::new();
        renderer.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "frame,x,y,z");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,0.000000000,0.000000000,0.2"));
    }
}
