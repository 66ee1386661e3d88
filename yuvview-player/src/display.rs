//! On-screen playback loop.
//!
//! Each tick pulls one picture from the sequencer, uploads it as a
//! texture and schedules the next tick so pictures arrive at the
//! configured rate (twice the frame rate when deinterlacing).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use yuvview_core::{
    decode_file, DeinterlaceMode, FieldOutput, FileSource, FrameSource, Parity, Sequencer,
};

use crate::settings::PlayerSettings;

const FALLBACK_SIZE: [f32; 2] = [720.0, 576.0];

// ============================================================================
// Pacing & Labels
// ============================================================================

/// Time between pictures, truncated to whole milliseconds.
pub fn picture_delay(fps: f64, mode: DeinterlaceMode) -> Duration {
    let rate = fps * mode.outputs_per_frame() as f64;
    Duration::from_millis((1000.0 / rate) as u64)
}

/// Wait before the next picture, never less than a millisecond.
pub fn next_wait(delay: Duration, elapsed: Duration) -> Duration {
    delay.saturating_sub(elapsed).max(Duration::from_millis(1))
}

pub fn window_title(label: &str, mode: DeinterlaceMode, field: Option<Parity>) -> String {
    match field {
        Some(parity) => format!(
            "YUV Player - {} ({} Field {})",
            label,
            mode.name(),
            parity.offset() + 1
        ),
        None => format!("YUV Player - {}", label),
    }
}

// ============================================================================
// Application State
// ============================================================================

struct PlayerApp {
    sequencer: Sequencer<FileSource>,
    mode: DeinterlaceMode,
    delay: Duration,
    next_step: Instant,
    texture: Option<TextureHandle>,
    frame_size: [usize; 2],
    last_error: Option<String>,
}

impl PlayerApp {
    fn new(sequencer: Sequencer<FileSource>, fps: f64) -> Self {
        let mode = sequencer.config().mode;
        Self {
            sequencer,
            mode,
            delay: picture_delay(fps, mode),
            next_step: Instant::now(),
            texture: None,
            frame_size: [0, 0],
            last_error: None,
        }
    }

    fn step(&mut self, ctx: &egui::Context) {
        match self.sequencer.next() {
            Ok(FieldOutput { frame, index, field }) => {
                let label = self.sequencer.source().label(index);
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(window_title(
                    &label, self.mode, field,
                )));

                let image = ColorImage::from_rgb([frame.width, frame.height], frame.as_bytes());
                self.texture = Some(ctx.load_texture("video_frame", image, TextureOptions::LINEAR));
                self.frame_size = [frame.width, frame.height];
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!("{}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if now >= self.next_step {
            self.step(ctx);
            self.next_step = Instant::now() + next_wait(self.delay, now.elapsed());
        }
        ctx.request_repaint_after(self.next_step.saturating_duration_since(Instant::now()));

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();

                let Some(texture) = &self.texture else {
                    let text = self.last_error.as_deref().unwrap_or("Waiting for frames...");
                    ui.centered_and_justified(|ui| {
                        ui.heading(egui::RichText::new(text).color(egui::Color32::GRAY));
                    });
                    return;
                };

                // Aspect-correct fit
                let aspect = self.frame_size[0] as f32 / self.frame_size[1] as f32;
                let panel_aspect = rect.width() / rect.height();
                let (w, h) = if aspect > panel_aspect {
                    (rect.width(), rect.width() / aspect)
                } else {
                    (rect.height() * aspect, rect.height())
                };
                let video_rect = egui::Rect::from_center_size(rect.center(), egui::vec2(w, h));

                ui.painter().image(
                    texture.id(),
                    video_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            });
    }
}

/// Open a window sized to the first decodable frame and play `files` in a loop.
pub fn run_display(files: Vec<PathBuf>, settings: &PlayerSettings) -> Result<()> {
    let source = FileSource::new(files);
    let size = source
        .paths()
        .iter()
        .find_map(|path| decode_file(path).ok())
        .map(|frame| [frame.width as f32, frame.height as f32])
        .unwrap_or(FALLBACK_SIZE);

    tracing::info!(
        "Playing {} file(s) at {} fps, deinterlace: {}",
        source.len(),
        settings.fps,
        settings.deinterlace.name()
    );

    let sequencer = Sequencer::new(source, settings.sequencer_config());
    let fps = settings.fps;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("YUV Player")
            .with_inner_size(size),
        ..Default::default()
    };

    eframe::run_native(
        "YUV Player",
        options,
        Box::new(move |_cc| Ok(Box::new(PlayerApp::new(sequencer, fps)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deinterlaced_playback_doubles_the_rate() {
        assert_eq!(
            picture_delay(25.0, DeinterlaceMode::Progressive),
            Duration::from_millis(40)
        );
        assert_eq!(picture_delay(25.0, DeinterlaceMode::Bob), Duration::from_millis(20));
        // 1000 / 59.94 = 16.68 -> 16
        assert_eq!(
            picture_delay(29.97, DeinterlaceMode::Adaptive),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn wait_never_drops_below_one_millisecond() {
        let delay = Duration::from_millis(40);
        assert_eq!(next_wait(delay, Duration::from_millis(15)), Duration::from_millis(25));
        assert_eq!(next_wait(delay, Duration::from_millis(90)), Duration::from_millis(1));
    }

    #[test]
    fn titles_name_the_field_on_screen() {
        assert_eq!(
            window_title("a.pgm", DeinterlaceMode::Progressive, None),
            "YUV Player - a.pgm"
        );
        assert_eq!(
            window_title("a.pgm", DeinterlaceMode::Bob, Some(Parity::Top)),
            "YUV Player - a.pgm (bob Field 1)"
        );
        assert_eq!(
            window_title("a.pgm", DeinterlaceMode::Adaptive, Some(Parity::Bottom)),
            "YUV Player - a.pgm (adaptive Field 2)"
        );
    }
}
