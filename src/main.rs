use anyhow::Result;
use log::{error, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use palm_overlay::asset::ThreadedModelLoader;
use palm_overlay::camera::OpenCvCameraProvider;
use palm_overlay::config::Config;
use palm_overlay::hand::HandLandmarkDetector;
use palm_overlay::overlay::OverlaySettings;
use palm_overlay::render::{Key, MinifbRenderer};
use palm_overlay::scheduler::{FramePacer, FrameScheduler};
use palm_overlay::session::{
    CaptureRequest, Session, SessionState, Status, StatusLine, StatusSink,
};

const CONFIG_PATH: &str = "config.toml";
const WINDOW_TITLE: &str = "Palm Overlay";

type AppSession = Session<
    OpenCvCameraProvider,
    HandLandmarkDetector,
    MinifbRenderer,
    FramePacer,
    ThreadedModelLoader,
    StatusTee,
>;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn open_log_file() -> Result<BufWriter<File>> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/palm_overlay_{}.log", ts);
    let file = File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(BufWriter::new(file))
}

/// 状態表示をログファイルにも書き出す
struct StatusTee {
    line: StatusLine,
    file: Option<BufWriter<File>>,
}

impl StatusSink for StatusTee {
    fn publish(&mut self, status: Status) {
        self.line.publish(status);
        if let Some(f) = self.file.as_mut() {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(f, "{} {}", ts, status);
            let _ = f.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker loading
// ---------------------------------------------------------------------------

fn spawn_tracker_loader(config: &Config) -> Receiver<Result<HandLandmarkDetector>> {
    let tracker_config = config.tracker.clone();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(HandLandmarkDetector::new(&tracker_config));
    });
    rx
}

/// 読み込みが終わるまで毎フレーム確認する。終わったら None を返す
fn pump_tracker(
    session: &mut AppSession,
    rx: Receiver<Result<HandLandmarkDetector>>,
) -> Option<Receiver<Result<HandLandmarkDetector>>> {
    match rx.try_recv() {
        Ok(Ok(detector)) => {
            session.install_tracker(detector);
            println!("Press SPACE to start/stop, UP/DOWN to change scale, ESC to exit");
            None
        }
        Ok(Err(e)) => {
            error!("failed to load hand tracker: {:#}", e);
            None
        }
        Err(TryRecvError::Empty) => Some(rx),
        Err(TryRecvError::Disconnected) => {
            error!("hand tracker loader exited");
            None
        }
    }
}

fn handle_keys(session: &mut AppSession, keys: &[Key]) {
    for key in keys {
        match key {
            Key::Space => {
                if let Err(e) = session.toggle() {
                    warn!("{}", e);
                }
            }
            Key::Up | Key::Equal => session.adjust_scale_multiplier(1),
            Key::Down | Key::Minus => session.adjust_scale_multiplier(-1),
            _ => {}
        }
    }
}

fn window_title(session: &AppSession) -> String {
    let status = session
        .status_sink()
        .line
        .current()
        .map(|s| s.to_string())
        .unwrap_or_default();
    format!(
        "{} - {} - scale x{:.2}",
        WINDOW_TITLE,
        status,
        session.settings().scale_multiplier()
    )
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load_or_default(CONFIG_PATH);
    let file = if config.log.file {
        match open_log_file() {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("failed to open log file: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    println!("Loading hand tracker from {}...", config.tracker.model_path);
    let mut tracker_rx = Some(spawn_tracker_loader(&config));

    let renderer = MinifbRenderer::new(
        WINDOW_TITLE,
        config.camera.width as usize,
        config.camera.height as usize,
        config.debug.show_landmarks,
    )?;
    let scheduler = FrameScheduler::new(renderer, FramePacer::new(config.app.target_fps));

    let mut session: AppSession = Session::new(
        OpenCvCameraProvider::new(&config.camera),
        scheduler,
        ThreadedModelLoader::spawn(&config.model.path),
        StatusTee {
            line: StatusLine::default(),
            file,
        },
        OverlaySettings::from_config(&config.overlay),
        CaptureRequest::from_config(&config.camera),
    );

    let mut title = String::new();

    // メインループ
    while session.scheduler().renderer().is_open() {
        if let Some(rx) = tracker_rx.take() {
            tracker_rx = pump_tracker(&mut session, rx);
        }

        let keys = session.scheduler().renderer().keys_pressed();
        handle_keys(&mut session, &keys);

        session.poll();

        // 停止中は描画しないのでイベントだけ処理する
        if session.state() != SessionState::Running {
            session.scheduler_mut().renderer_mut().pump_events();
        }

        let next_title = window_title(&session);
        if next_title != title {
            session.scheduler_mut().renderer_mut().set_title(&next_title);
            title = next_title;
        }
    }

    println!("Shutting down...");
    session.stop();
    Ok(())
}
