//! Generators for replacement markup: text paragraphs, tables and inline
//! images. All of them are pure; they only depend on their arguments.

use crate::relationships::RelationshipId;
use crate::xml::Element;

/// EMUs per centimeter.
pub const EMU_PER_CM: f64 = 360_000.0;

/// Total relative width shared by a generated table's columns.
pub const TABLE_TOTAL_WIDTH: u32 = 5000;

const DRAWINGML_MAIN_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const DRAWINGML_PICTURE_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Convert centimeters to EMUs, rounded to the nearest unit.
pub fn cm_to_emu(cm: f64) -> i64 {
    (cm * EMU_PER_CM).round() as i64
}

/// Split `total` evenly across `columns`; the rounding remainder goes to the
/// last column so the widths always sum to `total`.
pub fn column_widths(columns: usize, total: u32) -> Vec<u32> {
    if columns == 0 {
        return Vec::new();
    }
    let base = total / columns as u32;
    let mut widths = vec![base; columns];
    let sum: u32 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last += total - sum;
    }
    widths
}

/// A `w:t` carrying `text`, marked space-preserving when it has edge spaces.
pub fn text_element(text: &str) -> Element {
    let t = Element::new("w:t");
    let t = if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t.attr("xml:space", "preserve")
    } else {
        t
    };
    t.text(text)
}

/// A paragraph with the given properties and one run of text.
pub fn text_paragraph(formatting: &Element, run_properties: Option<&Element>, text: &str) -> Element {
    Element::new("w:p")
        .child(formatting.clone())
        .child(run(run_properties, text))
}

fn run(run_properties: Option<&Element>, text: &str) -> Element {
    let mut r = Element::new("w:r");
    if let Some(rpr) = run_properties {
        r = r.child(rpr.clone());
    }
    r.child(text_element(text))
}

fn border(side: &str) -> Element {
    Element::new(side)
        .attr("w:val", "single")
        .attr("w:sz", "4")
        .attr("w:space", "0")
        .attr("w:color", "000000")
}

fn borders(container: &str, sides: &[&str]) -> Element {
    sides
        .iter()
        .fold(Element::new(container), |el, side| el.child(border(side)))
}

fn table_cell(width: u32, content: &str) -> Element {
    let tc_pr = Element::new("w:tcPr")
        .child(
            Element::new("w:tcW")
                .attr("w:w", width.to_string())
                .attr("w:type", "dxa"),
        )
        .child(borders(
            "w:tcBorders",
            &["w:top", "w:left", "w:bottom", "w:right"],
        ));
    let paragraph = Element::new("w:p")
        .child(Element::new("w:pPr").child(Element::new("w:jc").attr("w:val", "center")))
        .child(run(None, content));
    Element::new("w:tc").child(tc_pr).child(paragraph)
}

/// Build a bordered table from rows of cell text.
///
/// The column count comes from the first row. Cells past that width reuse
/// the last column's width; short rows simply have fewer cells.
pub fn table(rows: &[Vec<String>], total_width: u32) -> Element {
    let columns = rows.first().map_or(0, Vec::len);
    let widths = column_widths(columns, total_width);

    let tbl_pr = Element::new("w:tblPr")
        .child(
            Element::new("w:tblW")
                .attr("w:w", total_width.to_string())
                .attr("w:type", "pct"),
        )
        .child(borders(
            "w:tblBorders",
            &["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"],
        ))
        .child(
            Element::new("w:tblLook")
                .attr("w:val", "04A0")
                .attr("w:firstRow", "1")
                .attr("w:lastRow", "0")
                .attr("w:firstColumn", "1")
                .attr("w:lastColumn", "0")
                .attr("w:noHBand", "0")
                .attr("w:noVBand", "1"),
        );

    let grid = widths.iter().fold(Element::new("w:tblGrid"), |grid, w| {
        grid.child(Element::new("w:gridCol").attr("w:w", w.to_string()))
    });

    let mut tbl = Element::new("w:tbl").child(tbl_pr).child(grid);
    for row in rows {
        let mut tr = Element::new("w:tr");
        for (i, cell) in row.iter().enumerate() {
            let width = widths
                .get(i)
                .or_else(|| widths.last())
                .copied()
                .unwrap_or(total_width);
            tr = tr.child(table_cell(width, cell));
        }
        tbl = tbl.child(tr);
    }
    tbl
}

/// Build an inline `w:drawing` showing the image behind `rel_id`, sized
/// `cx` × `cy` EMUs.
///
/// The display ids are the relationship id's number, so they are unique
/// as long as relationship ids are.
pub fn image_frame(rel_id: RelationshipId, cx: i64, cy: i64) -> Element {
    let id = rel_id.number().to_string();
    let name = format!("Picture {}", id);
    let (cx, cy) = (cx.to_string(), cy.to_string());

    let pic = Element::new("pic:pic")
        .attr("xmlns:pic", DRAWINGML_PICTURE_NS)
        .child(
            Element::new("pic:nvPicPr")
                .child(
                    Element::new("pic:cNvPr")
                        .attr("id", id.as_str())
                        .attr("name", name.as_str()),
                )
                .child(
                    Element::new("pic:cNvPicPr")
                        .child(Element::new("a:picLocks").attr("noChangeAspect", "1")),
                ),
        )
        .child(
            Element::new("pic:blipFill")
                .child(Element::new("a:blip").attr("r:embed", rel_id.to_string()))
                .child(Element::new("a:stretch").child(Element::new("a:fillRect"))),
        )
        .child(
            Element::new("pic:spPr")
                .attr("bwMode", "auto")
                .child(
                    Element::new("a:xfrm")
                        .child(Element::new("a:off").attr("x", "0").attr("y", "0"))
                        .child(
                            Element::new("a:ext")
                                .attr("cx", cx.as_str())
                                .attr("cy", cy.as_str()),
                        ),
                )
                .child(
                    Element::new("a:prstGeom")
                        .attr("prst", "rect")
                        .child(Element::new("a:avLst")),
                )
                .child(Element::new("a:noFill")),
        );

    let inline = Element::new("wp:inline")
        .attr("distT", "0")
        .attr("distB", "0")
        .attr("distL", "0")
        .attr("distR", "0")
        .child(
            Element::new("wp:extent")
                .attr("cx", cx.as_str())
                .attr("cy", cy.as_str()),
        )
        .child(
            Element::new("wp:effectExtent")
                .attr("l", "0")
                .attr("t", "0")
                .attr("r", "0")
                .attr("b", "0"),
        )
        .child(
            Element::new("wp:docPr")
                .attr("id", id.as_str())
                .attr("name", name.as_str()),
        )
        .child(
            Element::new("wp:cNvGraphicFramePr").child(
                Element::new("a:graphicFrameLocks")
                    .attr("xmlns:a", DRAWINGML_MAIN_NS)
                    .attr("noChangeAspect", "1"),
            ),
        )
        .child(
            Element::new("a:graphic")
                .attr("xmlns:a", DRAWINGML_MAIN_NS)
                .child(
                    Element::new("a:graphicData")
                        .attr("uri", DRAWINGML_PICTURE_NS)
                        .child(pic),
                ),
        );

    Element::new("w:drawing").child(inline)
}
