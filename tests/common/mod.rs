//! Synthetic answer sheets for integration tests
//!
//! Builds a template with the five color zones laid out side by side and
//! ring-shaped bubbles on a regular lattice, and scans of it with inked
//! bubbles.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use optic_form_reader::{BoundingBox, GridLayout, Orientation, Region};

pub const PITCH: u32 = 24;
pub const MARGIN: u32 = 20;
pub const RING_OUTER: i32 = 9;
pub const RING_INNER: i32 = 6;

pub const WIDTH: u32 = 480;
pub const HEIGHT: u32 = 820;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([20, 20, 30]);

/// Top-left corner of each zone on the template
fn origin(region: Region) -> (u32, u32) {
    match region {
        Region::StudentNumber => (20, 20),
        Region::ExamType => (260, 20),
        Region::Group => (330, 20),
        Region::Semester => (330, 90),
        Region::Answers => (20, 300),
    }
}

/// Bubble columns and rows as printed on the sheet
fn lattice_size(region: Region) -> (u32, u32) {
    match region.layout() {
        GridLayout::Strip {
            count,
            orientation: Orientation::Vertical,
        } => (1, count as u32),
        GridLayout::Strip {
            count,
            orientation: Orientation::Horizontal,
        } => (count as u32, 1),
        GridLayout::Columns {
            columns,
            per_column,
        } => (columns as u32, per_column as u32),
        GridLayout::Rows { rows, per_row } => (per_row as u32, rows as u32),
    }
}

/// Printed zone rectangle
pub fn zone(region: Region) -> BoundingBox {
    let (x, y) = origin(region);
    let (cols, rows) = lattice_size(region);
    BoundingBox::new(
        x,
        y,
        2 * MARGIN + (cols - 1) * PITCH,
        2 * MARGIN + (rows - 1) * PITCH,
    )
}

/// Center of bubble `slot` in logical row `row` of `region`
///
/// Logical rows are digit positions for the student number, questions for
/// the answers and the whole strip for control strips.
pub fn center(region: Region, row: usize, slot: usize) -> (u32, u32) {
    let bbox = zone(region);
    let (x0, y0) = (bbox.x + MARGIN, bbox.y + MARGIN);
    let (row, slot) = (row as u32, slot as u32);
    match region.layout() {
        GridLayout::Strip {
            orientation: Orientation::Vertical,
            ..
        } => (x0, y0 + slot * PITCH),
        GridLayout::Strip {
            orientation: Orientation::Horizontal,
            ..
        } => (x0 + slot * PITCH, y0),
        GridLayout::Columns { .. } => (x0 + row * PITCH, y0 + slot * PITCH),
        GridLayout::Rows { .. } => (x0 + slot * PITCH, y0 + row * PITCH),
    }
}

/// Template with every zone
pub fn template() -> RgbImage {
    template_without(&[])
}

/// Template with the zones in `missing` left unprinted
pub fn template_without(missing: &[Region]) -> RgbImage {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
    for region in Region::ALL {
        if missing.contains(&region) {
            continue;
        }
        paint_zone(&mut image, region, zone(region));
        let layout = region.layout();
        for row in 0..layout.slot_rows() {
            for slot in 0..layout.slots_per_row() {
                draw_ring(&mut image, center(region, row, slot));
            }
        }
    }
    image
}

/// Fill `bbox` with the print color of `region`
pub fn paint_zone(image: &mut RgbImage, region: Region, bbox: BoundingBox) {
    draw_filled_rect_mut(
        image,
        Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height),
        Rgb(region.reference_color()),
    );
}

fn draw_ring(image: &mut RgbImage, (x, y): (u32, u32)) {
    let c = (x as i32, y as i32);
    draw_filled_circle_mut(image, c, RING_OUTER, Rgb([0, 0, 0]));
    draw_filled_circle_mut(image, c, RING_INNER, WHITE);
}

/// Ink bubble `slot` of logical row `row`
pub fn ink(scan: &mut RgbImage, region: Region, row: usize, slot: usize) {
    let (x, y) = center(region, row, slot);
    draw_filled_circle_mut(scan, (x as i32, y as i32), RING_OUTER, INK);
}

/// Marks a student made on a sheet
///
/// Strings use the decoded alphabet: a digit or letter inks that bubble,
/// `X` leaves the row empty and `M` inks the first two bubbles.
#[derive(Debug, Clone)]
pub struct Marks {
    pub student_number: String,
    pub exam_type: Option<usize>,
    pub group: Option<usize>,
    pub semester: Option<usize>,
    pub answers: String,
}

impl Default for Marks {
    fn default() -> Self {
        Self {
            student_number: "20231457".to_string(),
            exam_type: Some(0),
            group: Some(0),
            semester: Some(1),
            answers: "ABCDEEDCBAXMABCDEABC".to_string(),
        }
    }
}

/// Scan of `template` filled in with `marks`
pub fn scan(template: &RgbImage, marks: &Marks) -> RgbImage {
    let mut scan = template.clone();
    ink_string(&mut scan, Region::StudentNumber, &marks.student_number);
    ink_string(&mut scan, Region::Answers, &marks.answers);

    let strips = [
        (Region::ExamType, marks.exam_type),
        (Region::Group, marks.group),
        (Region::Semester, marks.semester),
    ];
    for (region, choice) in strips {
        if let Some(slot) = choice {
            ink(&mut scan, region, 0, slot);
        }
    }
    scan
}

fn ink_string(scan: &mut RgbImage, region: Region, marks: &str) {
    for (row, mark) in marks.chars().enumerate() {
        match mark {
            'X' => {}
            'M' => {
                ink(scan, region, row, 0);
                ink(scan, region, row, 1);
            }
            '0'..='9' => ink(scan, region, row, mark as usize - '0' as usize),
            'A'..='E' => ink(scan, region, row, mark as usize - 'A' as usize),
            other => panic!("unsupported mark {:?}", other),
        }
    }
}
