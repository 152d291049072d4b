//! Streams the engine's RGB24 frame buffer into an SDL texture, scaled up to
//! fill the window while keeping the Game Boy's native 160x144 aspect ratio.

use boyemu_core::{Rgb, SCREEN_HEIGHT, SCREEN_WIDTH};
use sdl2::pixels::Color;
use sdl2::pixels::PixelFormatEnum::RGB24;
use sdl2::render::{Texture, WindowCanvas};

pub fn setup_canvas(canvas: &mut WindowCanvas) -> Texture {
    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas
        .set_logical_size(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
        .expect("logical size is a fixed, valid resolution");
    canvas.present();
    canvas
        .create_texture_streaming(RGB24, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
        .expect("streaming texture creation should not fail for a fixed small resolution")
}

/// Panics if `frame.len() * 3` doesn't match the texture's buffer size, which
/// can't happen here since both are sized from the same screen constants.
pub fn present_frame(canvas: &mut WindowCanvas, texture: &mut Texture, frame: &[Rgb]) {
    texture
        .with_lock(None, |buf, _pitch| {
            for (i, colour) in frame.iter().enumerate() {
                let offset = i * 3;
                buf[offset] = colour.0;
                buf[offset + 1] = colour.1;
                buf[offset + 2] = colour.2;
            }
        })
        .expect("fixed-size lock over a fixed-size texture cannot fail");
    let _ = canvas.copy(texture, None, None);
    canvas.present();
}
