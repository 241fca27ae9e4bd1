use glam::Vec3;

/// RGBA8 texel data ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

/// Width of generated color ramps.
pub const RAMP_WIDTH: u32 = 256;

/// Polynomial fit of the matplotlib "plasma" colormap, `t` in `[0, 1]`.
pub fn plasma(t: f32) -> Vec3 {
    const C: [Vec3; 7] = [
        Vec3::new(0.058_732_344, 0.023_336_709, 0.543_340_2),
        Vec3::new(2.176_514_6, 0.238_383_42, 0.753_960_4),
        Vec3::new(-2.689_460_5, -7.455_851, 3.110_8),
        Vec3::new(6.130_348_4, 42.346_19, -28.518_855),
        Vec3::new(-11.107_436, -82.666_31, 60.139_847),
        Vec3::new(10.023_066, 71.413_62, -54.072_186),
        Vec3::new(-3.658_714, -22.931_535, 18.191_908),
    ];
    let t = t.clamp(0.0, 1.0);
    let c = C.iter().rev().fold(Vec3::ZERO, |acc, c| acc * t + *c);
    c.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Sample `f` into a 1-texel-high ramp.
pub fn ramp_texture(name: &str, f: impl Fn(f32) -> Vec3) -> TextureData {
    let mut rgba = Vec::with_capacity(RAMP_WIDTH as usize * 4);
    for x in 0..RAMP_WIDTH {
        let c = f(x as f32 / (RAMP_WIDTH - 1) as f32);
        rgba.extend([
            (c.x * 255.0).round() as u8,
            (c.y * 255.0).round() as u8,
            (c.z * 255.0).round() as u8,
            255,
        ]);
    }
    TextureData {
        name: name.to_string(),
        width: RAMP_WIDTH,
        height: 1,
        rgba,
    }
}

/// Resolve a built-in ramp by name.
pub fn builtin_ramp(name: &str) -> Option<TextureData> {
    match name {
        "plasma" => Some(ramp_texture(name, plasma)),
        "gray" => Some(ramp_texture(name, Vec3::splat)),
        _ => None,
    }
}
