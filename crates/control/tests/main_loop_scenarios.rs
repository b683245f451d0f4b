use approx::assert_relative_eq;
use control::{EventQueue, LoopConfig, MainLoop};
use mechanics::{TdcrConfig, TendonDrivenModel};
use nalgebra::DVector;
use simcore::{
    BackbonePoses, EventHandler, Key, KinematicFailure, KinematicModel, LoopEvent, LoopState,
    Renderer, ScenarioMode, SkeletonGeometry, SurfaceHandle,
};

#[derive(Default)]
struct RecordingRenderer {
    scenes: Vec<ScenarioMode>,
    skeletons: Vec<SkeletonGeometry>,
    frames: Vec<BackbonePoses>,
}

impl Renderer for RecordingRenderer {
    fn init_scene(&mut self, mode: ScenarioMode) {
        self.scenes.push(mode);
    }

    fn draw_skeleton(&mut self, skeleton: &SkeletonGeometry) {
        self.skeletons.push(skeleton.clone());
    }

    fn update_pose(&mut self, disks: BackbonePoses) {
        self.frames.push(disks);
    }

    fn surface_handle(&self) -> SurfaceHandle {
        SurfaceHandle {
            title: "recording".to_string(),
            size: [640, 480],
        }
    }
}

fn key(name: &str) -> LoopEvent {
    LoopEvent::KeyPress(Key::from(name))
}

#[test]
fn test_ticks_see_committed_keys() {
    let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut main_loop = MainLoop::new(&model, &mut renderer, LoopConfig::default()).unwrap();
    main_loop.start();

    let mut queue = EventQueue::new();
    queue.extend([key("1"), LoopEvent::TimerTick, key("q"), LoopEvent::TimerTick]);
    assert_eq!(queue.dispatch_all(&mut main_loop), 4);
    drop(main_loop);

    // Initial render, then one per tick
    assert_eq!(renderer.frames.len(), 3);
    let bent = &renderer.frames[1];
    let straight = &renderer.frames[2];
    assert_ne!(bent, straight);

    let expected_bent = model
        .forward_kinematics(&DVector::from_column_slice(&[0.0005, 0.0]))
        .unwrap();
    let expected_straight = model.forward_kinematics(&DVector::zeros(2)).unwrap();
    assert_eq!(bent, &expected_bent.disks);
    assert_eq!(straight, &expected_straight.disks);
}

#[test]
fn test_shutdown_is_idempotent() {
    let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
    let mut main_loop =
        MainLoop::new(&model, RecordingRenderer::default(), LoopConfig::default()).unwrap();
    main_loop.start();

    main_loop.handle(&LoopEvent::Shutdown);
    main_loop.handle(&LoopEvent::Shutdown);
    assert_eq!(main_loop.run_state(), LoopState::Stopped);

    let mut queue = EventQueue::new();
    queue.extend([LoopEvent::TimerTick, key("1"), LoopEvent::TimerTick]);
    assert_eq!(queue.dispatch_all(&mut main_loop), 0);

    main_loop.on_timer_tick();
    let stats = main_loop.stats();
    assert_eq!(stats.ticks, 0);
    assert_eq!(stats.renders, 1);
    assert_eq!(main_loop.into_renderer().frames.len(), 1);
}

#[test]
fn test_failure_retains_last_render() {
    let config = TdcrConfig {
        actuation_step: 0.025,
        ..TdcrConfig::default()
    };
    let model = TendonDrivenModel::new(config).unwrap();
    let mut main_loop =
        MainLoop::new(&model, RecordingRenderer::default(), LoopConfig::default()).unwrap();
    main_loop.start();

    let mut queue = EventQueue::new();
    queue.extend([key("1"), LoopEvent::TimerTick, key("1"), LoopEvent::TimerTick, LoopEvent::TimerTick]);
    queue.dispatch_all(&mut main_loop);

    assert!(matches!(
        main_loop.last_failure(),
        Some(KinematicFailure::CurvatureExceeded { segment: 0, .. })
    ));
    assert_eq!(main_loop.run_state(), LoopState::Running);
    let stats = main_loop.stats();
    assert_eq!(stats.renders, 2);
    assert_eq!(stats.failures, 2);

    let frames = main_loop.into_renderer().frames;
    let bent = model
        .forward_kinematics(&DVector::from_column_slice(&[0.025, 0.0]))
        .unwrap();
    assert_eq!(frames.last(), Some(&bent.disks));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
    let mut main_loop =
        MainLoop::new(&model, RecordingRenderer::default(), LoopConfig::default()).unwrap();
    main_loop.start();

    for name in ["F5", "z", "3", "up"] {
        main_loop.on_key_press(&Key::from(name));
    }
    main_loop.on_timer_tick();

    assert_eq!(main_loop.state().actuation, DVector::zeros(2));
    assert_eq!(main_loop.stats().ignored_keys, 4);
    assert_eq!(main_loop.run_state(), LoopState::Running);
}

#[test]
fn test_assignment4_starts_from_preset() {
    let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
    let config = LoopConfig::default().with_scenario(ScenarioMode::Assignment4);
    let mut main_loop = MainLoop::new(&model, RecordingRenderer::default(), config).unwrap();
    main_loop.start();

    assert_eq!(main_loop.state().actuation.as_slice(), &[-0.005, 0.0025]);
    main_loop.on_key_press(&Key::Up);
    main_loop.on_key_press(&Key::Left);
    let actuation = &main_loop.state().actuation;
    assert_relative_eq!(actuation[0], -0.0045, epsilon = 1e-15);
    assert_relative_eq!(actuation[1], 0.002, epsilon = 1e-15);

    let renderer = main_loop.into_renderer();
    assert_eq!(renderer.scenes, vec![ScenarioMode::Assignment4]);
    assert_eq!(renderer.skeletons.len(), 1);
    assert_eq!(renderer.skeletons[0].pitch_radii, vec![0.006, 0.005]);
    assert_eq!(renderer.frames.len(), 1);
}

#[test]
fn test_cycling_while_paused_shows_new_preset() {
    let model = TendonDrivenModel::new(TdcrConfig::default()).unwrap();
    let mut main_loop =
        MainLoop::new(&model, RecordingRenderer::default(), LoopConfig::default()).unwrap();
    main_loop.start();

    let mut queue = EventQueue::new();
    queue.extend([key("space"), key("m")]);
    queue.extend((0..5).map(|_| LoopEvent::TimerTick));
    queue.dispatch_all(&mut main_loop);
    assert_eq!(main_loop.run_state(), LoopState::Paused);

    let renderer = main_loop.into_renderer();
    assert_eq!(renderer.scenes, vec![ScenarioMode::Default, ScenarioMode::Assignment4]);
    assert_eq!(renderer.frames.len(), 2);
    let preset = model
        .forward_kinematics(&DVector::from_column_slice(&[-0.005, 0.0025]))
        .unwrap();
    assert_eq!(renderer.frames.last(), Some(&preset.disks));
}
