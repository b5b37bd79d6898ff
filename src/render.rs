//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API). The result is passed through
//! [`normalize_pdf`] so identical layouts give identical bytes.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};
use printpdf::*;

use crate::error::Result;
use crate::fetch::ImageStore;
use crate::layout_config::*;
use crate::normalize::normalize_pdf;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// pt → mm
const MM_PER_PT: f32 = 0.352778;

/// Render a LayoutConfig into PDF bytes.
///
/// Images are looked up in `images` by their `src`; boxes whose image is
/// missing or cannot be embedded are left empty (a `log::warn` is emitted).
pub fn render_pdf(config: &LayoutConfig, images: &ImageStore) -> Result<Vec<u8>> {
    let page_w = Mm(config.page_width_pt * MM_PER_PT);
    let page_h = Mm(config.page_height_pt * MM_PER_PT);

    let mut doc = PdfDocument::new(&config.title);

    // ── Pre-register all images, in a stable order ────────────────────────
    let mut all_srcs: BTreeSet<&str> = BTreeSet::new();
    for page_layout in &config.pages {
        for lbox in page_layout.boxes.iter().chain(&page_layout.margin_boxes) {
            collect_image_srcs(lbox, &mut all_srcs);
        }
    }

    let mut image_resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for src in all_srcs {
        let Some(image) = images.get(src) else {
            warn!("Skipping image {src:?}: not loaded");
            continue;
        };
        let raw = match RawImage::decode_from_bytes(&image.bytes, &mut img_warnings) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping image {src:?}: {e}");
                continue;
            }
        };
        let xobj_id = doc.add_image(&raw);
        image_resources.insert(
            src.to_string(),
            ImageResource {
                xobj_id,
                px_width: image.px_width,
                px_height: image.px_height,
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages = Vec::new();

    for page_layout in &config.pages {
        let mut ops = Vec::new();
        for lbox in page_layout.boxes.iter().chain(&page_layout.margin_boxes) {
            render_box(&mut ops, lbox, config.page_height_pt, &image_resources);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }
    debug!("Rendering {} page(s), {} image(s)", pages.len(), image_resources.len());

    doc.with_pages(pages);
    let mut save_warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut save_warnings);

    normalize_pdf(&bytes, &config.title)
}

/// Pick the standard face for a family and variant.
fn builtin_font(family: &str, bold: bool, italic: bool) -> BuiltinFont {
    match (family, bold, italic) {
        ("Times", true, true) => BuiltinFont::TimesBoldItalic,
        ("Times", true, false) => BuiltinFont::TimesBold,
        ("Times", false, true) => BuiltinFont::TimesItalic,
        ("Times", false, false) => BuiltinFont::TimesRoman,
        ("Courier", true, true) => BuiltinFont::CourierBoldOblique,
        ("Courier", true, false) => BuiltinFont::CourierBold,
        ("Courier", false, true) => BuiltinFont::CourierOblique,
        ("Courier", false, false) => BuiltinFont::Courier,
        (_, true, true) => BuiltinFont::HelveticaBoldOblique,
        (_, true, false) => BuiltinFont::HelveticaBold,
        (_, false, true) => BuiltinFont::HelveticaOblique,
        (_, false, false) => BuiltinFont::Helvetica,
    }
}

/// Recursively collect all unique `image.src` strings from a [`LayoutBox`] tree.
fn collect_image_srcs<'a>(lbox: &'a LayoutBox, srcs: &mut BTreeSet<&'a str>) {
    if let Some(img) = &lbox.image {
        srcs.insert(img.src.as_str());
    }
    for child in &lbox.children {
        collect_image_srcs(child, srcs);
    }
}

fn rgb(c: [f32; 4]) -> printpdf::Color {
    printpdf::Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn stroke(ops: &mut Vec<Op>, points: Vec<LinePoint>, is_closed: bool) {
    ops.push(Op::DrawLine {
        line: Line { points, is_closed },
    });
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<String, ImageResource>,
) {
    // PDF coordinate system: origin at bottom-left.
    // Our layout uses origin at top-left. Convert:
    let pdf_y = page_height - lbox.y;
    let (x1, x2) = (lbox.x, lbox.x + lbox.width);
    let (y1, y2) = (pdf_y - lbox.height, pdf_y);

    // Background
    if let Some(bg) = lbox.background_color {
        ops.push(Op::SetFillColor { col: rgb(bg) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    // Border: one closed path when uniform, otherwise each side on its own.
    if let Some(border) = &lbox.border {
        ops.push(Op::SetOutlineColor {
            col: rgb(border.color),
        });
        let [top, right, bottom, left] = border.widths;
        if top == right && right == bottom && bottom == left {
            let inset = top / 2.0;
            ops.push(Op::SetOutlineThickness { pt: Pt(top) });
            stroke(
                ops,
                vec![
                    point(x1 + inset, y2 - inset),
                    point(x2 - inset, y2 - inset),
                    point(x2 - inset, y1 + inset),
                    point(x1 + inset, y1 + inset),
                ],
                true,
            );
        } else {
            let sides = [
                (top, point(x1, y2 - top / 2.0), point(x2, y2 - top / 2.0)),
                (right, point(x2 - right / 2.0, y2), point(x2 - right / 2.0, y1)),
                (bottom, point(x1, y1 + bottom / 2.0), point(x2, y1 + bottom / 2.0)),
                (left, point(x1 + left / 2.0, y2), point(x1 + left / 2.0, y1)),
            ];
            for (width, from, to) in sides {
                if width > 0.0 {
                    ops.push(Op::SetOutlineThickness { pt: Pt(width) });
                    stroke(ops, vec![from, to], false);
                }
            }
        }
    }

    // Text
    if let Some(text) = &lbox.text {
        let font = builtin_font(&text.font_family, text.bold, text.italic);
        let baseline = if text.baseline > 0.0 {
            text.baseline
        } else {
            text.font_size * 0.75
        };

        for tline in &text.lines {
            if tline.text.is_empty() {
                continue;
            }
            let text_x = lbox.x + tline.x_offset;
            let text_y = pdf_y - tline.y_offset - baseline;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(text_x),
                    y: Pt(text_y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(text.font_size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(text.line_height),
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(tline.text.clone())],
                font,
            });
            ops.push(Op::EndTextSection);

            if text.underline {
                let underline_y = text_y - text.font_size * 0.1;
                let width = if tline.width > 0.0 {
                    tline.width
                } else {
                    lbox.width
                };
                ops.push(Op::SetOutlineThickness {
                    pt: Pt((text.font_size / 16.0).max(0.5)),
                });
                ops.push(Op::SetOutlineColor {
                    col: rgb(text.color),
                });
                stroke(
                    ops,
                    vec![point(text_x, underline_y), point(text_x + width, underline_y)],
                    false,
                );
            }
        }
    }

    // Image – embed from pre-registered XObject
    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(&img.src) {
            // translate_y = bottom edge of image in PDF coordinates.
            let img_bottom_y = page_height - lbox.y - img.height;

            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = if res.px_width > 0 {
                img.width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                img.height / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(img_bottom_y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }

    // Children
    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}
