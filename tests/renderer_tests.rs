// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the streaming renderer, driven through a recording
//! backend so no GPU is needed

use std::sync::{Arc, Barrier, Mutex, Weak, mpsc};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use yuvplay::errors::{RenderError, RenderResult, TransformError};
use yuvplay::renderer::{
    FramePlanes, RenderBackend, RendererConfig, RendererState, Snapshot, StreamingRenderer,
    Viewport, ViewportMode,
};
use yuvplay::Layout;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create { thread: ThreadId },
    Resize(u32, u32),
    Upload {
        width: u32,
        height: u32,
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
    },
    Draw(Option<Viewport>),
    Drop { thread: ThreadId },
}

type Log = Arc<Mutex<Vec<Call>>>;

#[derive(Clone)]
struct MockSurface {
    log: Log,
    size: (u32, u32),
    fail_create: bool,
    fail_draw: bool,
    /// When set, `upload` meets the test thread here twice: once on entry
    /// and once before returning
    upload_gate: Option<Arc<Barrier>>,
}

impl MockSurface {
    fn new(log: &Log, width: u32, height: u32) -> Self {
        Self {
            log: Arc::clone(log),
            size: (width, height),
            fail_create: false,
            fail_draw: false,
            upload_gate: None,
        }
    }
}

struct MockBackend {
    surface: MockSurface,
}

impl MockBackend {
    fn record(&self, call: Call) {
        self.surface.log.lock().unwrap().push(call);
    }
}

impl RenderBackend for MockBackend {
    type Surface = MockSurface;

    fn create(surface: MockSurface, _config: &RendererConfig) -> RenderResult<Self> {
        if surface.fail_create {
            return Err(RenderError::InitFailed("shader rejected".to_string()));
        }
        let backend = MockBackend { surface };
        backend.record(Call::Create {
            thread: thread::current().id(),
        });
        Ok(backend)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface.size
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.surface.size = (width, height);
        self.record(Call::Resize(width, height));
        Ok(())
    }

    fn upload(&mut self, planes: &FramePlanes<'_>) -> RenderResult<()> {
        self.record(Call::Upload {
            width: planes.width,
            height: planes.height,
            y: planes.y.to_vec(),
            u: planes.u.to_vec(),
            v: planes.v.to_vec(),
        });
        if let Some(gate) = &self.surface.upload_gate {
            gate.wait();
            gate.wait();
        }
        Ok(())
    }

    fn draw(&mut self, viewport: Option<Viewport>) -> RenderResult<()> {
        if self.surface.fail_draw {
            return Err(RenderError::Gpu("device lost".to_string()));
        }
        self.record(Call::Draw(viewport));
        Ok(())
    }

    fn read_back(&mut self) -> RenderResult<Option<Snapshot>> {
        let (width, height) = self.surface.size;
        Ok(Some(Snapshot {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
        }))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.record(Call::Drop {
            thread: thread::current().id(),
        });
    }
}

/// 4x4 I420 frame: luma filled with `tag`, U with `tag + 1`, V with `tag + 2`
fn tagged_frame(tag: u8) -> Vec<u8> {
    let mut frame = vec![tag; 16];
    frame.extend_from_slice(&[tag + 1; 4]);
    frame.extend_from_slice(&[tag + 2; 4]);
    frame
}

fn uploads(log: &Log) -> Vec<Call> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, Call::Upload { .. }))
        .cloned()
        .collect()
}

fn draws(log: &Log) -> Vec<Option<Viewport>> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|c| match c {
            Call::Draw(viewport) => Some(*viewport),
            _ => None,
        })
        .collect()
}

/// Poll `condition` until it holds or `timeout` passes
fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn backend_threads(log: &Log) -> (Option<ThreadId>, Option<ThreadId>) {
    let calls = log.lock().unwrap();
    let created = calls.iter().find_map(|c| match c {
        Call::Create { thread } => Some(*thread),
        _ => None,
    });
    let dropped = calls.iter().find_map(|c| match c {
        Call::Drop { thread } => Some(*thread),
        _ => None,
    });
    (created, dropped)
}

/// Renderer whose error handler tears it down after `delay`
fn self_closing_renderer(delay: Duration) -> Arc<StreamingRenderer<MockBackend>> {
    Arc::new_cyclic(|weak: &Weak<StreamingRenderer<MockBackend>>| {
        let weak = weak.clone();
        StreamingRenderer::with_error_handler(RendererConfig::default(), move |_err| {
            thread::sleep(delay);
            if let Some(renderer) = weak.upgrade() {
                renderer.teardown();
            }
        })
    })
}

fn ready_renderer(log: &Log, config: RendererConfig) -> StreamingRenderer<MockBackend> {
    let renderer = StreamingRenderer::<MockBackend>::new(config);
    renderer
        .initialize(MockSurface::new(log, 8, 8))
        .expect("mock backend initializes");
    renderer
}

#[test]
fn test_latest_frame_wins() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());
    assert_eq!(renderer.state(), RendererState::SurfaceReady);

    renderer.deliver_frame(&tagged_frame(10), 4, 4).unwrap();
    renderer.deliver_frame(&tagged_frame(20), 4, 4).unwrap();
    assert_eq!(renderer.state(), RendererState::HasFrame);

    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    let uploaded = uploads(&log);
    assert_eq!(uploaded.len(), 1);
    assert_eq!(
        uploaded[0],
        Call::Upload {
            width: 4,
            height: 4,
            y: vec![20; 16],
            u: vec![21; 4],
            v: vec![22; 4],
        }
    );
    assert_eq!(draws(&log).len(), 1);
}

#[test]
fn test_unchanged_frame_is_not_uploaded_again() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());

    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();
    renderer.request_draw().unwrap();
    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    assert_eq!(uploads(&log).len(), 1);
    assert_eq!(draws(&log).len(), 2);
}

#[test]
fn test_draw_without_frame_clears_only() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());

    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    assert!(uploads(&log).is_empty());
    assert_eq!(draws(&log), vec![None]);
}

#[test]
fn test_calls_before_initialize() {
    let log = Log::default();
    let renderer = StreamingRenderer::<MockBackend>::new(RendererConfig::default());

    assert_eq!(renderer.request_draw(), Err(RenderError::SurfaceNotReady));
    assert_eq!(
        renderer.deliver_frame(&tagged_frame(1), 4, 4),
        Err(RenderError::SurfaceNotReady)
    );
    assert_eq!(renderer.resize(4, 4), Err(RenderError::SurfaceNotReady));
    assert_eq!(renderer.state(), RendererState::Uninitialized);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_init_failure_leaves_renderer_uninitialized() {
    let log = Log::default();
    let renderer = StreamingRenderer::<MockBackend>::new(RendererConfig::default());

    let mut surface = MockSurface::new(&log, 8, 8);
    surface.fail_create = true;
    let result = renderer.initialize(surface);

    assert!(matches!(result, Err(RenderError::InitFailed(_))));
    assert_eq!(renderer.state(), RendererState::Uninitialized);
    assert_eq!(renderer.request_draw(), Err(RenderError::SurfaceNotReady));

    // A fresh surface can still be used
    renderer.initialize(MockSurface::new(&log, 8, 8)).unwrap();
    assert_eq!(renderer.state(), RendererState::SurfaceReady);
}

#[test]
fn test_calls_after_teardown_are_no_ops() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());
    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();

    renderer.teardown();
    assert_eq!(renderer.state(), RendererState::Destroyed);
    let calls_at_teardown = log.lock().unwrap().len();
    assert!(matches!(
        log.lock().unwrap().last(),
        Some(Call::Drop { .. })
    ));

    assert_eq!(renderer.deliver_frame(&tagged_frame(2), 4, 4), Ok(()));
    assert_eq!(renderer.request_draw(), Ok(()));
    assert_eq!(renderer.resize(16, 16), Ok(()));
    assert_eq!(renderer.wait_idle(), Ok(()));
    assert_eq!(renderer.read_back(), Ok(None));
    assert_eq!(renderer.initialize(MockSurface::new(&log, 8, 8)), Ok(()));
    renderer.teardown();

    assert_eq!(renderer.state(), RendererState::Destroyed);
    assert_eq!(log.lock().unwrap().len(), calls_at_teardown);
}

#[test]
fn test_backend_lives_on_render_thread() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());
    renderer.teardown();

    let calls = log.lock().unwrap().clone();
    let created = calls.iter().find_map(|c| match c {
        Call::Create { thread } => Some(*thread),
        _ => None,
    });
    let dropped = calls.iter().find_map(|c| match c {
        Call::Drop { thread } => Some(*thread),
        _ => None,
    });

    assert!(created.is_some());
    assert_eq!(created, dropped);
    assert_ne!(created, Some(thread::current().id()));
}

#[test]
fn test_gpu_errors_reach_handler() {
    let log = Log::default();
    let errors: Arc<Mutex<Vec<RenderError>>> = Arc::default();
    let sink = Arc::clone(&errors);
    let renderer =
        StreamingRenderer::<MockBackend>::with_error_handler(RendererConfig::default(), move |e| {
            sink.lock().unwrap().push(e.clone());
        });

    let mut surface = MockSurface::new(&log, 8, 8);
    surface.fail_draw = true;
    renderer.initialize(surface).unwrap();
    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();

    // The call itself succeeds; the failure is reported asynchronously
    assert_eq!(renderer.request_draw(), Ok(()));
    renderer.wait_idle().unwrap();

    assert_eq!(
        *errors.lock().unwrap(),
        vec![RenderError::Gpu("device lost".to_string())]
    );
    assert_eq!(renderer.state(), RendererState::HasFrame);
    assert_eq!(uploads(&log).len(), 1);
}

#[test]
fn test_letterbox_viewport() {
    let log = Log::default();
    let config = RendererConfig {
        viewport_mode: ViewportMode::Letterbox,
        ..RendererConfig::default()
    };
    let renderer = StreamingRenderer::<MockBackend>::new(config);
    renderer
        .initialize(MockSurface::new(&log, 1000, 400))
        .unwrap();

    let frame = vec![16u8; 200 * 100 * 3 / 2];
    renderer.deliver_frame(&frame, 200, 100).unwrap();
    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    assert_eq!(
        draws(&log),
        vec![Some(Viewport {
            x: 100,
            y: 0,
            width: 800,
            height: 400,
        })]
    );
}

#[test]
fn test_resize_is_forwarded() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());
    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();

    renderer.resize(64, 32).unwrap();
    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    assert!(log.lock().unwrap().contains(&Call::Resize(64, 32)));
    assert_eq!(
        draws(&log),
        vec![Some(Viewport {
            x: 0,
            y: 0,
            width: 64,
            height: 32,
        })]
    );
}

#[test]
fn test_invalid_frame_rejected() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());

    assert_eq!(
        renderer.deliver_frame(&[0u8; 23], 4, 4),
        Err(RenderError::Frame(TransformError::InvalidBufferSize {
            expected: 24,
            actual: 23,
        }))
    );
    assert!(matches!(
        renderer.deliver_frame(&[0u8; 24], 3, 4),
        Err(RenderError::Frame(TransformError::InvalidDimensions { .. }))
    ));
    assert_eq!(renderer.state(), RendererState::SurfaceReady);
}

#[test]
fn test_semi_planar_delivery_is_split_into_planes() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());

    let mut nv21 = vec![7u8; 16];
    nv21.extend_from_slice(&[100, 200, 101, 201, 102, 202, 103, 203]);
    renderer
        .deliver_frame_with_layout(&nv21, 4, 4, Layout::Nv21)
        .unwrap();
    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    assert_eq!(
        uploads(&log),
        vec![Call::Upload {
            width: 4,
            height: 4,
            y: vec![7; 16],
            u: vec![200, 201, 202, 203],
            v: vec![100, 101, 102, 103],
        }]
    );
}

#[test]
fn test_reinitialize_keeps_latest_frame() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());
    renderer.deliver_frame(&tagged_frame(5), 4, 4).unwrap();

    renderer.initialize(MockSurface::new(&log, 16, 16)).unwrap();
    assert_eq!(renderer.state(), RendererState::HasFrame);

    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    let calls = log.lock().unwrap().clone();
    let creates = calls
        .iter()
        .filter(|c| matches!(c, Call::Create { .. }))
        .count();
    assert_eq!(creates, 2);
    assert!(matches!(calls[1], Call::Drop { .. }));
    assert_eq!(uploads(&log).len(), 1);
    assert_eq!(
        draws(&log),
        vec![Some(Viewport {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
        })]
    );
}

#[test]
fn test_read_back_from_backend() {
    let log = Log::default();
    let renderer = ready_renderer(&log, RendererConfig::default());

    let snapshot = renderer.read_back().unwrap().expect("mock returns an image");
    assert_eq!((snapshot.width, snapshot.height), (8, 8));
    assert_eq!(snapshot.rgba.len(), 8 * 8 * 4);
}

#[test]
fn test_producer_and_host_threads() {
    let log = Log::default();
    let renderer = Arc::new(ready_renderer(&log, RendererConfig::default()));

    let producer = {
        let renderer = Arc::clone(&renderer);
        thread::spawn(move || {
            for tag in 0..50u8 {
                renderer.deliver_frame(&tagged_frame(tag), 4, 4).unwrap();
            }
        })
    };
    for _ in 0..20 {
        renderer.request_draw().unwrap();
    }
    producer.join().unwrap();

    renderer.request_draw().unwrap();
    renderer.wait_idle().unwrap();

    let uploaded = uploads(&log);
    assert!(!uploaded.is_empty());
    match uploaded.last() {
        Some(Call::Upload { y, .. }) => assert_eq!(y[0], 49),
        other => panic!("unexpected last upload: {:?}", other),
    }
    // Frames are never uploaded out of order
    let tags: Vec<u8> = uploaded
        .iter()
        .filter_map(|c| match c {
            Call::Upload { y, .. } => Some(y[0]),
            _ => None,
        })
        .collect();
    assert!(tags.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_teardown_during_upload_skips_draw() {
    let log = Log::default();
    let gate = Arc::new(Barrier::new(2));
    let mut surface = MockSurface::new(&log, 8, 8);
    surface.upload_gate = Some(Arc::clone(&gate));

    let renderer = Arc::new(StreamingRenderer::<MockBackend>::new(
        RendererConfig::default(),
    ));
    renderer.initialize(surface).unwrap();
    renderer.deliver_frame(&tagged_frame(3), 4, 4).unwrap();
    renderer.request_draw().unwrap();

    // Render thread is now inside upload
    gate.wait();
    let closer = {
        let renderer = Arc::clone(&renderer);
        thread::spawn(move || renderer.teardown())
    };
    assert!(wait_until(Duration::from_secs(5), || {
        renderer.state() == RendererState::Destroyed
    }));
    gate.wait();
    closer.join().unwrap();

    assert_eq!(uploads(&log).len(), 1);
    assert!(draws(&log).is_empty());
    let (created, dropped) = backend_threads(&log);
    assert!(created.is_some());
    assert_eq!(created, dropped);
    assert_ne!(created, Some(thread::current().id()));
}

#[test]
fn test_teardown_from_error_handler() {
    let log = Log::default();
    let renderer = self_closing_renderer(Duration::ZERO);
    let mut surface = MockSurface::new(&log, 8, 8);
    surface.fail_draw = true;
    renderer.initialize(surface).unwrap();
    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();
    renderer.request_draw().unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        backend_threads(&log).1.is_some()
    }));
    assert_eq!(renderer.state(), RendererState::Destroyed);
    let (created, dropped) = backend_threads(&log);
    assert_eq!(created, dropped);
    assert_ne!(created, Some(thread::current().id()));

    let calls = log.lock().unwrap().len();
    assert_eq!(renderer.request_draw(), Ok(()));
    assert_eq!(renderer.wait_idle(), Ok(()));
    assert_eq!(log.lock().unwrap().len(), calls);
}

#[test]
fn test_reinitialize_while_error_handler_tears_down() {
    let log = Log::default();
    let renderer = self_closing_renderer(Duration::from_millis(200));
    let mut surface = MockSurface::new(&log, 8, 8);
    surface.fail_draw = true;
    renderer.initialize(surface).unwrap();
    renderer.deliver_frame(&tagged_frame(1), 4, 4).unwrap();
    renderer.request_draw().unwrap();
    thread::sleep(Duration::from_millis(50));

    // The handler is still sleeping when the host swaps the surface
    let (done, result) = mpsc::channel();
    {
        let renderer = Arc::clone(&renderer);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let _ = done.send(renderer.initialize(MockSurface::new(&log, 16, 16)));
        });
    }
    let reinitialized = result
        .recv_timeout(Duration::from_secs(5))
        .expect("initialize returns while the handler tears down");

    assert_eq!(reinitialized, Ok(()));
    assert_eq!(renderer.state(), RendererState::Destroyed);
    assert!(wait_until(Duration::from_secs(5), || {
        backend_threads(&log).1.is_some()
    }));
    let creates = log
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, Call::Create { .. }))
        .count();
    assert_eq!(creates, 1);
}
