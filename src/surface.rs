//! Canvas-style drawing surfaces
//!
//! Renderers draw in logical (CSS pixel) coordinates. A surface owns a backing
//! buffer sized `logical * device_pixel_ratio` and a uniform scale transform,
//! so output stays crisp on high-density displays.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Gridlines (`#f3f4f6`)
    pub const GRID: Color = Color::rgb(0xf3, 0xf4, 0xf6);
    /// Secondary text (`#6b7280`)
    pub const MUTED: Color = Color::rgb(0x6b, 0x72, 0x80);
    /// Primary text (`#111827`)
    pub const INK: Color = Color::rgb(0x11, 0x18, 0x27);
    /// Card border (`#e5e7eb`)
    pub const BORDER: Color = Color::rgb(0xe5, 0xe7, 0xeb);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
    Alphabetic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    pub size: f64,
    pub bold: bool,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

impl TextStyle {
    pub fn new(color: Color, size: f64) -> Self {
        Self {
            color,
            size,
            bold: false,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
        }
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn baseline(mut self, baseline: TextBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Minimal 2D drawing context. Coordinates are logical pixels once
/// [`DrawingSurface::set_scale`] has been applied.
pub trait DrawingSurface {
    /// Logical size of the surface as laid out by the host.
    fn logical_size(&self) -> Size;

    fn device_pixel_ratio(&self) -> f64;

    /// Resize the backing pixel buffer. Discards anything drawn so far and
    /// resets the transform.
    fn allocate(&mut self, width_px: u32, height_px: u32);

    fn set_scale(&mut self, scale: f64);

    fn clear(&mut self, area: Rect);

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64);

    fn polyline(&mut self, points: &[Point], color: Color, width: f64);

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    fn fill_rect(&mut self, area: Rect, color: Color);

    fn stroke_rect(&mut self, area: Rect, color: Color, width: f64);

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle);
}

/// Allocate the backing buffer for the surface's current logical size and
/// switch drawing to logical coordinates. Returns that logical size.
pub fn prepare(surface: &mut impl DrawingSurface) -> Size {
    let size = surface.logical_size();
    let ratio = surface.device_pixel_ratio();
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };

    let width_px = (size.width.max(0.0) * ratio).round() as u32;
    let height_px = (size.height.max(0.0) * ratio).round() as u32;
    surface.allocate(width_px, height_px);
    surface.set_scale(ratio);
    size
}

// ============================================================================
// SVG
// ============================================================================

/// Surface that produces an SVG document.
///
/// The root element is sized to the backing buffer; drawing happens inside a
/// `scale(dpr)` group so the logical layout is preserved.
pub struct SvgSurface {
    size: Size,
    ratio: f64,
    width_px: u32,
    height_px: u32,
    scale: f64,
    body: String,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            size: Size { width, height },
            ratio: device_pixel_ratio,
            width_px: width.max(0.0).round() as u32,
            height_px: height.max(0.0).round() as u32,
            scale: 1.0,
            body: String::new(),
        }
    }

    /// Change the logical size, as a host layout would on resize.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Size { width, height };
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            self.width_px, self.height_px, self.width_px, self.height_px
        );
        let _ = write!(svg, r#"<g transform="scale({})">"#, self.scale);
        svg.push_str(&self.body);
        svg.push_str("</g></svg>");
        svg
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl DrawingSurface for SvgSurface {
    fn logical_size(&self) -> Size {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.ratio
    }

    fn allocate(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px;
        self.height_px = height_px;
        self.scale = 1.0;
        self.body.clear();
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn clear(&mut self, area: Rect) {
        // Clearing the full logical area drops the display list; a partial
        // clear paints over with the background.
        if area.x <= 0.0
            && area.y <= 0.0
            && area.width >= self.size.width
            && area.height >= self.size.height
        {
            self.body.clear();
        } else {
            self.fill_rect(area, Color::WHITE);
        }
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        let _ = write!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
            from.x,
            from.y,
            to.x,
            to.y,
            color.to_hex(),
            width
        );
    }

    fn polyline(&mut self, points: &[Point], color: Color, width: f64) {
        if points.is_empty() {
            return;
        }

        let mut path = String::new();
        for (i, p) in points.iter().enumerate() {
            if i == 0 {
                let _ = write!(path, "M{},{}", p.x, p.y);
            } else {
                let _ = write!(path, " L{},{}", p.x, p.y);
            }
        }
        let _ = write!(
            self.body,
            r#"<path d="{}" stroke="{}" stroke-width="{}" stroke-linejoin="round" fill="none"/>"#,
            path,
            color.to_hex(),
            width
        );
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let _ = write!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            center.x,
            center.y,
            radius,
            color.to_hex()
        );
    }

    fn fill_rect(&mut self, area: Rect, color: Color) {
        let _ = write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            area.x,
            area.y,
            area.width,
            area.height,
            color.to_hex()
        );
    }

    fn stroke_rect(&mut self, area: Rect, color: Color, width: f64) {
        let _ = write!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="{}" rx="6"/>"#,
            area.x,
            area.y,
            area.width,
            area.height,
            color.to_hex(),
            width
        );
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        let anchor = match style.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let baseline = match style.baseline {
            TextBaseline::Top => "hanging",
            TextBaseline::Middle => "central",
            TextBaseline::Alphabetic => "alphabetic",
        };
        let weight = if style.bold { "bold" } else { "normal" };
        let _ = write!(
            self.body,
            r#"<text x="{}" y="{}" text-anchor="{}" dominant-baseline="{}" font-family="sans-serif" font-size="{}" font-weight="{}" fill="{}">{}</text>"#,
            at.x,
            at.y,
            anchor,
            baseline,
            style.size,
            weight,
            style.color.to_hex(),
            escape_text(text)
        );
    }
}

// ============================================================================
// Display list
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Allocate { width_px: u32, height_px: u32 },
    Scale(f64),
    Clear(Rect),
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f64,
    },
    Polyline {
        points: Vec<Point>,
        color: Color,
        width: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        color: Color,
    },
    FillRect { area: Rect, color: Color },
    StrokeRect { area: Rect, color: Color },
    Text {
        text: String,
        at: Point,
        style: TextStyle,
    },
}

/// Surface that records every call. Useful for inspecting what a renderer
/// produced without rasterizing it.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Size,
    ratio: f64,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            size: Size { width, height },
            ratio: device_pixel_ratio,
            ops: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Size { width, height };
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[Point], Color)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Polyline { points, color, .. } => Some((points.as_slice(), *color)),
            _ => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = (Point, Color)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Circle { center, color, .. } => Some((*center, *color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = (&str, Point)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, at, .. } => Some((text.as_str(), *at)),
            _ => None,
        })
    }

    /// Every coordinate passed to the surface, in call order.
    pub fn coordinates(&self) -> Vec<f64> {
        let mut out = Vec::new();
        for op in &self.ops {
            match op {
                DrawOp::Line { from, to, .. } => out.extend([from.x, from.y, to.x, to.y]),
                DrawOp::Polyline { points, .. } => {
                    out.extend(points.iter().flat_map(|p| [p.x, p.y]))
                }
                DrawOp::Circle { center, radius, .. } => {
                    out.extend([center.x, center.y, *radius])
                }
                DrawOp::Clear(r) => out.extend([r.x, r.y, r.width, r.height]),
                DrawOp::FillRect { area: r, .. } | DrawOp::StrokeRect { area: r, .. } => {
                    out.extend([r.x, r.y, r.width, r.height])
                }
                DrawOp::Text { at, .. } => out.extend([at.x, at.y]),
                DrawOp::Allocate { .. } | DrawOp::Scale(_) => {}
            }
        }
        out
    }
}

impl DrawingSurface for RecordingSurface {
    fn logical_size(&self) -> Size {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.ratio
    }

    fn allocate(&mut self, width_px: u32, height_px: u32) {
        self.ops.clear();
        self.ops.push(DrawOp::Allocate {
            width_px,
            height_px,
        });
    }

    fn set_scale(&mut self, scale: f64) {
        self.ops.push(DrawOp::Scale(scale));
    }

    fn clear(&mut self, area: Rect) {
        self.ops.push(DrawOp::Clear(area));
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f64) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            color,
            width,
        });
    }

    fn polyline(&mut self, points: &[Point], color: Color, width: f64) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color,
            width,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.ops.push(DrawOp::Circle {
            center,
            radius,
            color,
        });
    }

    fn fill_rect(&mut self, area: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { area, color });
    }

    fn stroke_rect(&mut self, area: Rect, color: Color, _width: f64) {
        self.ops.push(DrawOp::StrokeRect { area, color });
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            at,
            style: *style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_scales_backing_buffer_by_pixel_ratio() {
        let mut surface = RecordingSurface::new(400.0, 300.0, 2.0);
        let size = prepare(&mut surface);

        assert_eq!(size.width, 400.0);
        assert_eq!(
            surface.ops,
            vec![
                DrawOp::Allocate {
                    width_px: 800,
                    height_px: 600
                },
                DrawOp::Scale(2.0),
            ]
        );
    }

    #[test]
    fn prepare_falls_back_to_unit_ratio() {
        let mut surface = RecordingSurface::new(10.0, 10.0, f64::NAN);
        prepare(&mut surface);
        assert_eq!(surface.ops[1], DrawOp::Scale(1.0));
    }

    #[test]
    fn svg_document_is_sized_in_device_pixels() {
        let mut surface = SvgSurface::new(400.0, 200.0, 1.5);
        prepare(&mut surface);
        surface.fill_text("a<b", Point::new(1.0, 2.0), &TextStyle::new(Color::INK, 12.0));

        let svg = surface.to_svg();
        assert!(svg.starts_with(r#"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="300""#));
        assert!(svg.contains(r#"<g transform="scale(1.5)">"#));
        assert!(svg.contains(">a&lt;b</text>"));
        assert_eq!(surface.pixel_size(), (600, 300));
    }

    #[test]
    fn full_clear_drops_previous_drawing() {
        let mut surface = SvgSurface::new(100.0, 100.0, 1.0);
        prepare(&mut surface);
        surface.fill_circle(Point::new(5.0, 5.0), 3.0, Color::INK);
        surface.clear(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert!(!surface.to_svg().contains("<circle"));
    }

    #[test]
    fn rect_contains_its_edges() {
        let rect = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(30.0, 15.0)));
        assert!(!rect.contains(Point::new(30.1, 12.0)));
    }
}
