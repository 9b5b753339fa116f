//! Built-in procedural volumes selected by reserved locators.

use rayon::prelude::*;
use reqwest::Url;

/// Edge length of every built-in volume.
pub const BUILTIN_SIZE: usize = 256;

/// A deterministic single-byte volume generated in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinVolume {
    /// Solid sphere with falloff, wrapped by three helical tubes.
    Helix,
    /// Six coloured slabs along the faces of the cube.
    Box,
    /// Intensity equal to the x coordinate.
    Colormap,
}

impl BuiltinVolume {
    pub const ALL: [Self; 3] = [Self::Helix, Self::Box, Self::Colormap];

    /// Reserved locator selecting this volume.
    pub fn locator(&self) -> &'static str {
        match self {
            Self::Helix => "file:///default_helix",
            Self::Box => "file:///default_box",
            Self::Colormap => "file:///default_colormap",
        }
    }

    /// The reserved locator as a URL.
    pub fn url(&self) -> Url {
        // Reserved locators are static, well-formed file URLs.
        Url::parse(self.locator()).expect("reserved locator is a valid URL")
    }

    /// Match `url` against the reserved locators.
    pub fn from_url(url: &Url) -> Option<Self> {
        Self::ALL.into_iter().find(|v| url.as_str() == v.locator())
    }

    /// Generate the volume: `BUILTIN_SIZE³` bytes, index `x + size * (z + size * y)`.
    pub fn generate(&self) -> Vec<u8> {
        let mut data = vec![0u8; BUILTIN_SIZE * BUILTIN_SIZE * BUILTIN_SIZE];
        match self {
            Self::Helix => {
                fill_sphere(&mut data);
                stamp_helix(&mut data, 0.0, 200);
                stamp_helix(&mut data, 30.0, 150);
                stamp_helix(&mut data, 60.0, 100);
            }
            Self::Box => fill_box_faces(&mut data),
            Self::Colormap => fill_gradient_x(&mut data),
        }
        data
    }
}

fn cell_index(x: usize, y: usize, z: usize) -> usize {
    x + BUILTIN_SIZE * (z + BUILTIN_SIZE * y)
}

fn fill_sphere(data: &mut [u8]) {
    let centre = (BUILTIN_SIZE / 2) as f32;
    data.par_chunks_mut(BUILTIN_SIZE * BUILTIN_SIZE)
        .enumerate()
        .for_each(|(y, slab)| {
            for z in 0..BUILTIN_SIZE {
                for x in 0..BUILTIN_SIZE {
                    let dist = distance(
                        (x as f32, y as f32, z as f32),
                        (centre, centre, centre),
                    );
                    // Negative inside the sphere.
                    let value = dist * 0.5 - 40.0;
                    slab[x + BUILTIN_SIZE * z] = if value >= 0.0 {
                        value.clamp(0.0, 80.0) as u8
                    } else {
                        80
                    };
                }
            }
        });
}

/// Stamp a tube of radius `THICK` along `x = r cos t, y = r sin t, z = climb t - z_offset`.
fn stamp_helix(data: &mut [u8], z_offset: f32, color: u8) {
    const RADIUS: f32 = 70.0;
    const CLIMB: f32 = 15.0;
    const THICK: i32 = 6;
    let offset = (BUILTIN_SIZE / 2) as f32;
    let max = BUILTIN_SIZE as i32 - 1;

    let mut last_cell = (0, 0, 0);
    for i in 0.. {
        let t = i as f32 * 0.005;
        let cell_x = (offset + RADIUS * t.cos()) as i32;
        let cell_y = (offset + RADIUS * t.sin()) as i32;
        let cell_z = (CLIMB * t - z_offset) as i32;
        if cell_z < 0 {
            continue;
        }
        if cell_z > max {
            break;
        }

        let cell = (cell_x, cell_y, cell_z);
        if cell == last_cell {
            continue;
        }
        last_cell = cell;

        let centre = (cell_x as f32, cell_y as f32, cell_z as f32);
        for z in (cell_z - THICK).max(0)..(cell_z + THICK).min(max + 1) {
            for y in (cell_y - THICK).max(0)..(cell_y + THICK).min(max + 1) {
                for x in (cell_x - THICK).max(0)..(cell_x + THICK).min(max + 1) {
                    if distance((x as f32, y as f32, z as f32), centre) < THICK as f32 {
                        data[cell_index(x as usize, y as usize, z as usize)] = color;
                    }
                }
            }
        }
    }
}

fn fill_box_faces(data: &mut [u8]) {
    const COLORS: [u8; 6] = [50, 100, 255, 200, 150, 10];
    const WIDTH: usize = 10;
    let last = BUILTIN_SIZE - 1;

    for i in 0..WIDTH {
        for a in 0..BUILTIN_SIZE {
            for b in 0..BUILTIN_SIZE {
                data[cell_index(i, a, b)] = COLORS[0];
                data[cell_index(last - i, a, b)] = COLORS[1];
            }
        }
    }
    for i in 0..WIDTH {
        for a in 0..BUILTIN_SIZE {
            for b in 0..BUILTIN_SIZE {
                data[cell_index(a, i, b)] = COLORS[2];
                data[cell_index(a, last - i, b)] = COLORS[3];
            }
        }
    }
    for i in 0..WIDTH {
        for a in 0..BUILTIN_SIZE {
            for b in 0..BUILTIN_SIZE {
                data[cell_index(a, b, i)] = COLORS[4];
                data[cell_index(a, b, last - i)] = COLORS[5];
            }
        }
    }
}

fn fill_gradient_x(data: &mut [u8]) {
    data.par_chunks_mut(BUILTIN_SIZE).for_each(|row| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = x as u8;
        }
    });
}

fn distance(a: (f32, f32, f32), b: (f32, f32, f32)) -> f32 {
    let (dx, dy, dz) = (a.0 - b.0, a.1 - b.1, a.2 - b.2);
    (dx * dx + dy * dy + dz * dz).sqrt()
}
