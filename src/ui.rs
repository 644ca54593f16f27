use egui::Context;
use crate::controller::FrameStats;
use crate::model::SceneState;

/// Build the debug overlay and return egui output. Purely informational:
/// no input is fed to egui, so the overlay never captures the pointer.
pub fn build_hud(
    egui_ctx: &Context,
    scene: &SceneState,
    stats: &FrameStats,
    canvas_width: u32,
    canvas_height: u32,
    pixels_per_point: f32,
    now_secs: f64,
) -> egui::FullOutput {
    let mut raw_input = egui::RawInput::default();
    raw_input.time = Some(now_secs);
    raw_input.screen_rect = Some(egui::Rect::from_min_size(
        egui::Pos2::new(0.0, 0.0),
        egui::vec2(
            canvas_width as f32 / pixels_per_point,
            canvas_height as f32 / pixels_per_point,
        ),
    ));
    if let Some(viewport) = raw_input.viewports.get_mut(&egui::ViewportId::ROOT) {
        viewport.native_pixels_per_point = Some(pixels_per_point);
    }

    egui_ctx.run(raw_input, |ctx| {
        draw_stats_window(ctx, scene, stats);
    })
}

fn draw_stats_window(ctx: &Context, scene: &SceneState, stats: &FrameStats) {
    let orientation = scene.orientation();

    egui::Window::new("Globe")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0}", stats.fps)).small());
            ui.label(egui::RichText::new(format!("Frames: {}", stats.frame_count)).small());
            ui.separator();
            ui.label(
                egui::RichText::new(format!(
                    "Pitch: {:.1} Yaw: {:.1}",
                    orientation.pitch.to_degrees(),
                    orientation.yaw.to_degrees()
                ))
                .small(),
            );
            ui.label(egui::RichText::new(format!("Spin: {:.1}", scene.spin().to_degrees())).small());
            let pointer = match stats.pointer {
                Some(p) => format!("Pointer: {:.2}, {:.2}", p.x, p.y),
                None => "Pointer: -".to_string(),
            };
            ui.label(egui::RichText::new(pointer).small());
            ui.label(egui::RichText::new(format!("Viewport: {}x{}", stats.viewport.0, stats.viewport.1)).small());
            ui.label(egui::RichText::new(format!("Stars: {}", scene.stars().len())).small());
        });
}
