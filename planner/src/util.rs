use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use log::debug;

use crate::{simplify::LineCells, Cell, GridMap, Point};

const FREE_COLOR: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const BLOCKED_COLOR: Rgb<u8> = Rgb([0x22, 0x22, 0x22]);
const RAW_PATH_COLOR: Rgb<u8> = Rgb([0xae, 0xc7, 0xe8]);
const PATH_COLOR: Rgb<u8> = Rgb([0x1f, 0x77, 0xb4]);
const START_COLOR: Rgb<u8> = Rgb([0x2c, 0xa0, 0x2c]);
const GOAL_COLOR: Rgb<u8> = Rgb([0xd6, 0x27, 0x28]);

/// Largest side of a rendered image in pixels
pub const MAX_IMAGE_SIDE: u32 = 16_384;

/// Dark pixels (red channel below 128) become blocked cells
pub fn parse_img(img: &DynamicImage) -> Result<GridMap, anyhow::Error> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    let mut rows = vec![vec![0u8; width]; height];

    for (row, values) in rows.iter_mut().enumerate() {
        for (col, value) in values.iter_mut().enumerate() {
            let p = img.get_pixel(col as u32, row as u32);

            *value = if p.0[0] < 128 { 1 } else { 0 };
        }
    }

    Ok(GridMap::from_rows(rows)?)
}

/// Reads a grid stored as a JSON array of `0/1` rows
pub fn load_grid_json(path: impl AsRef<Path>) -> Result<GridMap, anyhow::Error> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing grid {}", path.display()))
}

pub fn save_grid_json(map: &GridMap, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    std::fs::write(path, serde_json::to_string(map)?)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!("saved {}x{} grid to {}", map.rows(), map.columns(), path.display());
    Ok(())
}

/// Loads a grid from a `.json` file or from any image format the `image` crate reads
pub fn load_grid(path: impl AsRef<Path>) -> Result<GridMap, anyhow::Error> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let map = if is_json {
        load_grid_json(path)?
    } else {
        let img = image::open(path).with_context(|| format!("opening image {}", path.display()))?;
        parse_img(&img).with_context(|| format!("converting image {}", path.display()))?
    };

    debug!(
        "loaded {}x{} grid from {}",
        map.rows(),
        map.columns(),
        path.display()
    );
    Ok(map)
}

/// One `row,col` line per point
pub fn format_path(path: &[Point]) -> String {
    path.iter()
        .map(|p| format!("{},{}\n", p.row, p.col))
        .collect()
}

/// Parses `row,col` lines, blank lines are skipped
pub fn parse_path(text: &str) -> Result<Vec<Point>, anyhow::Error> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.parse::<Point>()
                .with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

pub fn write_path_txt(path: &[Point], file: impl AsRef<Path>) -> Result<(), anyhow::Error> {
    let file = file.as_ref();
    std::fs::write(file, format_path(path)).with_context(|| format!("writing {}", file.display()))
}

pub fn read_path_txt(file: impl AsRef<Path>) -> Result<Vec<Point>, anyhow::Error> {
    let file = file.as_ref();
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    parse_path(&text).with_context(|| format!("parsing path {}", file.display()))
}

fn fill_cell(img: &mut RgbImage, cell: Point, cell_px: u32, color: Rgb<u8>) {
    let (x0, y0) = (cell.col as u32 * cell_px, cell.row as u32 * cell_px);
    for y in y0..y0 + cell_px {
        for x in x0..x0 + cell_px {
            img.put_pixel(x, y, color);
        }
    }
}

fn outline_cell(img: &mut RgbImage, cell: Point, cell_px: u32, color: Rgb<u8>) {
    let (x0, y0) = (cell.col as u32 * cell_px, cell.row as u32 * cell_px);
    let width = (cell_px / 8).max(1);
    for y in y0..y0 + cell_px {
        for x in x0..x0 + cell_px {
            let edge = x - x0 < width
                || y - y0 < width
                || x0 + cell_px - 1 - x < width
                || y0 + cell_px - 1 - y < width;
            if edge {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn cell_center(cell: Point, cell_px: u32) -> Point {
    let half = (cell_px / 2) as usize;
    let px = cell_px as usize;
    Point::new(cell.row * px + half, cell.col * px + half)
}

/// Draws the grid with the raw path shaded cell by cell, the waypoints joined by straight
/// segments and the endpoints outlined. `cell_px` is the side of one cell in pixels.
///
/// Fails if either side of the image would exceed [`MAX_IMAGE_SIDE`].
pub fn render_path(
    map: &GridMap,
    raw: &[Point],
    waypoints: &[Point],
    cell_px: u32,
) -> Result<RgbImage, anyhow::Error> {
    let cell_px = cell_px.max(1);
    let side = |cells: usize| {
        u32::try_from(cells)
            .ok()
            .and_then(|cells| cells.checked_mul(cell_px))
            .filter(|&px| px <= MAX_IMAGE_SIDE)
    };
    let (Some(width), Some(height)) = (side(map.columns()), side(map.rows())) else {
        anyhow::bail!(
            "{}x{} grid at {} pixels per cell exceeds {} pixels per side",
            map.rows(),
            map.columns(),
            cell_px,
            MAX_IMAGE_SIDE
        );
    };
    let mut img = RgbImage::new(width, height);

    for row in 0..map.rows() {
        for col in 0..map.columns() {
            let cell = Point::new(row, col);
            let color = match map.get(cell) {
                Cell::Free => FREE_COLOR,
                Cell::Blocked => BLOCKED_COLOR,
            };
            fill_cell(&mut img, cell, cell_px, color);
        }
    }

    for &cell in raw.iter().filter(|p| map.is_valid(**p)) {
        fill_cell(&mut img, cell, cell_px, RAW_PATH_COLOR);
    }

    for leg in waypoints.windows(2) {
        let from = cell_center(leg[0], cell_px);
        let to = cell_center(leg[1], cell_px);
        for pixel in LineCells::new(from, to) {
            let (x, y) = (pixel.col as u32, pixel.row as u32);
            if x < img.width() && y < img.height() {
                img.put_pixel(x, y, PATH_COLOR);
            }
        }
    }

    if let (Some(&start), Some(&goal)) = (waypoints.first(), waypoints.last()) {
        if map.is_valid(start) && map.is_valid(goal) {
            outline_cell(&mut img, start, cell_px, START_COLOR);
            outline_cell(&mut img, goal, cell_px, GOAL_COLOR);
        }
    }

    Ok(img)
}
