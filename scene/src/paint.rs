//! Browser replay of a [`DisplayList`] onto a 2D canvas context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`;
//! the caller ([`crate::engine::Engine::render`]) logs them.
//!
//! The fog mask is uploaded to an offscreen canvas as black pixels carrying
//! the mask alpha, then composited with the opacity the display list asks for.

use std::f64::consts::PI;

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, ImageData};

use crate::fog::FogMask;
use crate::render::{DisplayList, DrawOp, Label, Style};

/// Owns the visible context, the offscreen fog surface and the decoded
/// background image.
pub struct Painter {
    ctx: CanvasRenderingContext2d,
    fog_canvas: HtmlCanvasElement,
    fog_ctx: CanvasRenderingContext2d,
    fog_rgba: Vec<u8>,
    background: Option<HtmlImageElement>,
}

impl Painter {
    /// Bind to `canvas` and allocate the offscreen fog surface.
    ///
    /// # Errors
    ///
    /// Fails when no 2D context or document is available.
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(canvas)?;
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let fog_canvas = document.create_element("canvas")?.dyn_into::<HtmlCanvasElement>()?;
        let fog_ctx = context_2d(&fog_canvas)?;
        Ok(Self { ctx, fog_canvas, fog_ctx, fog_rgba: Vec::new(), background: None })
    }

    /// Swap the decoded background image. The host decodes data URLs.
    pub fn set_background(&mut self, image: Option<HtmlImageElement>) {
        self.background = image;
    }

    /// Upload the fog mask to the offscreen surface.
    ///
    /// # Errors
    ///
    /// Fails when the image data cannot be built or written.
    pub fn upload_fog(&mut self, fog: &FogMask) -> Result<(), JsValue> {
        if fog.is_empty() {
            return Ok(());
        }
        if self.fog_canvas.width() != fog.width() || self.fog_canvas.height() != fog.height() {
            self.fog_canvas.set_width(fog.width());
            self.fog_canvas.set_height(fog.height());
        }
        self.fog_rgba.clear();
        self.fog_rgba.reserve(fog.alpha().len() * 4);
        for &a in fog.alpha() {
            self.fog_rgba.extend_from_slice(&[0, 0, 0, a]);
        }
        let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(&self.fog_rgba[..]), fog.width(), fog.height())?;
        self.fog_ctx.put_image_data(&data, 0.0, 0.0)
    }

    /// Replay one frame.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn paint(&self, list: &DisplayList) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        ctx.save();
        let result = list.ops.iter().try_for_each(|op| self.draw(op));
        ctx.restore();
        result
    }

    fn draw(&self, op: &DrawOp) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        match op {
            DrawOp::Begin { canvas, pan, zoom } => {
                ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
                ctx.clear_rect(0.0, 0.0, canvas.width, canvas.height);
                ctx.translate(pan.x, pan.y)?;
                ctx.scale(*zoom, *zoom)?;
            }
            DrawOp::BackgroundImage { size } => {
                if let Some(img) = &self.background {
                    ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, size.width, size.height)?;
                }
            }
            DrawOp::Rect { x, y, width, height, style } => {
                with_style(ctx, style, |ctx| {
                    if style.fill.is_some() {
                        ctx.fill_rect(*x, *y, *width, *height);
                    }
                    if style.stroke.is_some() {
                        ctx.stroke_rect(*x, *y, *width, *height);
                    }
                    Ok(())
                })?;
            }
            DrawOp::Line { from, to, style } => {
                with_style(ctx, style, |ctx| {
                    ctx.begin_path();
                    ctx.move_to(from.x, from.y);
                    ctx.line_to(to.x, to.y);
                    ctx.stroke();
                    Ok(())
                })?;
            }
            DrawOp::Circle { center, radius, style } => {
                with_style(ctx, style, |ctx| {
                    ctx.begin_path();
                    ctx.arc(center.x, center.y, radius.max(0.0), 0.0, PI * 2.0)?;
                    fill_and_stroke(ctx, style);
                    Ok(())
                })?;
            }
            DrawOp::Wedge { center, radius, start, end, style } => {
                with_style(ctx, style, |ctx| {
                    ctx.begin_path();
                    ctx.move_to(center.x, center.y);
                    ctx.arc(center.x, center.y, radius.max(0.0), *start, *end)?;
                    ctx.close_path();
                    fill_and_stroke(ctx, style);
                    Ok(())
                })?;
            }
            DrawOp::RotatedRect { origin, angle, x, y, width, height, style } => {
                with_style(ctx, style, |ctx| {
                    ctx.translate(origin.x, origin.y)?;
                    ctx.rotate(*angle)?;
                    if style.fill.is_some() {
                        ctx.fill_rect(*x, *y, *width, *height);
                    }
                    if style.stroke.is_some() {
                        ctx.stroke_rect(*x, *y, *width, *height);
                    }
                    Ok(())
                })?;
            }
            DrawOp::Text { text, at, font_px, color } => {
                ctx.set_fill_style_str(color);
                ctx.set_font(&format!("bold {font_px}px system-ui"));
                ctx.set_text_align("center");
                ctx.set_text_baseline("middle");
                ctx.fill_text(text, at.x, at.y)?;
            }
            DrawOp::Label(label) => draw_label(ctx, label)?,
            DrawOp::Fog { opacity } => {
                ctx.save();
                ctx.set_global_alpha(*opacity);
                let drawn = ctx.draw_image_with_html_canvas_element(&self.fog_canvas, 0.0, 0.0);
                ctx.restore();
                drawn?;
            }
        }
        Ok(())
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// Run `draw` with the style applied, restoring context state afterwards.
fn with_style(
    ctx: &CanvasRenderingContext2d,
    style: &Style,
    draw: impl FnOnce(&CanvasRenderingContext2d) -> Result<(), JsValue>,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_global_alpha(style.alpha);
    if let Some(fill) = &style.fill {
        ctx.set_fill_style_str(fill);
    }
    if let Some(stroke) = &style.stroke {
        ctx.set_stroke_style_str(stroke);
        ctx.set_line_width(style.line_width);
    }
    let result = set_dash(ctx, &style.dash).and_then(|()| draw(ctx));
    ctx.restore();
    result
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: &[f64]) -> Result<(), JsValue> {
    let dash_array = js_sys::Array::new();
    for segment in dash {
        dash_array.push(&(*segment).into());
    }
    ctx.set_line_dash(&dash_array)
}

fn fill_and_stroke(ctx: &CanvasRenderingContext2d, style: &Style) {
    if style.fill.is_some() {
        ctx.fill();
    }
    if style.stroke.is_some() {
        ctx.stroke();
    }
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &Label) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_global_alpha(label.alpha);
    ctx.set_font(&format!("bold {}px system-ui", label.font_px));
    let text_width = ctx.measure_text(&label.text).map(|m| m.width()).unwrap_or(0.0);
    let width = text_width + label.padding * 2.0;
    let x = label.center.x - width / 2.0;
    let y = label.center.y - label.height / 2.0;

    let drawn = (|| {
        rounded_rect_path(ctx, x, y, width, label.height, label.corner_radius)?;
        ctx.set_fill_style_str(&label.background);
        ctx.fill();
        ctx.set_stroke_style_str(&label.border);
        ctx.set_line_width(label.border_width);
        ctx.stroke();

        ctx.set_fill_style_str(&label.text_color);
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        ctx.fill_text(&label.text, label.center.x, label.center.y)
    })();
    ctx.restore();
    drawn
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) -> Result<(), JsValue> {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.arc_to(x + w, y, x + w, y + h, r)?;
    ctx.arc_to(x + w, y + h, x, y + h, r)?;
    ctx.arc_to(x, y + h, x, y, r)?;
    ctx.arc_to(x, y, x + w, y, r)?;
    ctx.close_path();
    Ok(())
}
