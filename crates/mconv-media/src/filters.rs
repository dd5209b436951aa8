//! FFmpeg filter graph definitions.

use mconv_models::WatermarkPosition;

/// Two-pass palette GIF filter: sample the clip, generate a palette, then map onto it.
pub fn animated_gif_filter(fps: u32, width: u32) -> String {
    format!(
        "fps={},scale={}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
        fps, width
    )
}

/// Overlay the second input onto the first.
pub fn overlay_filter(position: WatermarkPosition) -> String {
    format!("[0:v][1:v]overlay={}", position.overlay_expr())
}
