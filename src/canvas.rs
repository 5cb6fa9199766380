use crate::math::Mix;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn black() -> Self {
        Self::new(0., 0., 0.)
    }

    pub fn white() -> Self {
        Self::new(1., 1., 1.)
    }

    pub fn is_black(&self) -> bool {
        self.r == 0. && self.g == 0. && self.b == 0.
    }

    /// Build a color from an RGBA8 texel, discarding alpha.
    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self::new(
            px[0] as f32 / 255.,
            px[1] as f32 / 255.,
            px[2] as f32 / 255.,
        )
    }

    /// Resolve to an opaque RGBA8 quad: clamp to [0,1], scale, truncate.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let convert = |x: f32| (255. * x.clamp(0., 1.)) as u8;
        [convert(self.r), convert(self.g), convert(self.b), 255]
    }

    /// Drop any negative channels.
    pub fn max_zero(&self) -> Self {
        Self::new(self.r.max(0.), self.g.max(0.), self.b.max(0.))
    }

    /// Convert the [`Color`] to grayscale.
    pub fn to_grayscale(&self) -> f32 {
        0.3 * self.r + 0.59 * self.g + 0.11 * self.b
    }
}

impl Mix for &Color {
    type Output = Color;

    fn mix(self, other: Self, t: f32) -> Color {
        Color::new(
            self.r.mix(other.r, t),
            self.g.mix(other.g, t),
            self.b.mix(other.b, t),
        )
    }
}

impl std::ops::Mul<&Color> for f32 {
    type Output = Color;
    fn mul(self, rhs: &Color) -> Self::Output {
        Color::new(rhs.r * self, rhs.g * self, rhs.b * self)
    }
}

impl std::ops::Mul<Color> for f32 {
    type Output = Color;
    fn mul(self, rhs: Color) -> Self::Output {
        self * &rhs
    }
}

/// Channel-wise product, for modulating by a light or material color.
impl std::ops::Mul<&Color> for &Color {
    type Output = Color;
    fn mul(self, rhs: &Color) -> Self::Output {
        Color::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl std::ops::Add for &Color {
    type Output = Color;
    fn add(self, rhs: &Color) -> Self::Output {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl std::ops::AddAssign<&Color> for Color {
    fn add_assign(&mut self, rhs: &Color) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl std::ops::AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        self.add_assign(&rhs)
    }
}

/// A buffer of color data, row-major with `(0,0)` at the top-left.
pub struct Canvas {
    width: u32,
    height: u32,
    buffer: Vec<Color>,
}

impl Canvas {
    /// Construct a new [`Canvas`].
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        let mut buffer = Vec::with_capacity(size);
        buffer.resize_with(size, Default::default);
        Self {
            width,
            height,
            buffer,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (self.width as usize) * y + x
    }

    /// Fetch a color in the [`Canvas`].
    pub fn get(&self, x: usize, y: usize) -> &Color {
        let ix = self.index(x, y);
        &self.buffer[ix]
    }

    /// Mutate a color in the [`Canvas`].
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Color {
        let ix = self.index(x, y);
        &mut self.buffer[ix]
    }

    /// Overwrite row `y` with a finished row of pixels.
    pub fn blit_row(&mut self, y: usize, row: Vec<Color>) {
        assert_eq!(row.len(), self.width as usize);
        let start = self.index(0, y);
        self.buffer[start..start + row.len()].clone_from_slice(&row);
    }

    /// Return raw RGBA8 data for the image, top row first.
    pub fn data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.buffer.len() * 4);

        for color in &self.buffer {
            data.extend_from_slice(&color.to_rgba8());
        }

        data
    }

    /// Return an ascii version of the [`Canvas`].
    pub fn to_ascii(&self) -> String {
        let mut buf = String::new();
        let palette = r#"$@B%8&WM#*oahkbdpqwmZO0QLCJUYXzcvunxrjft/\|()1{}[]?-_+~<>i!lI;:,"^`'. "#;
        let bytes = palette.as_bytes();
        let bound = (palette.len() - 1) as f32;

        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let g = self.get(x, y).to_grayscale().clamp(0., 1.);
                let index = (g * bound) as usize;
                buf.push(bytes[index] as char);
            }
            buf.push('\n');
        }

        buf
    }
}

#[test]
fn test_to_rgba8() {
    assert_eq!([255, 0, 0, 255], Color::new(1.5, -0.25, 0.).to_rgba8());
    assert_eq!([127, 255, 255, 255], Color::new(0.5, 1.0, 2.0).to_rgba8());
}

#[test]
fn test_canvas_layout() {
    let mut c = Canvas::new(3, 2);
    *c.get_mut(1, 1) = Color::white();

    // index = row * width + col
    let data = c.data();
    assert_eq!(&data[(1 * 3 + 1) * 4..(1 * 3 + 1) * 4 + 4], &[255; 4]);
    assert_eq!(&data[0..4], &[0, 0, 0, 255]);
}

#[test]
fn test_blit_row() {
    let mut c = Canvas::new(2, 2);
    c.blit_row(1, vec![Color::white(), Color::black()]);
    assert_eq!(c.get(0, 1), &Color::white());
    assert_eq!(c.get(1, 0), &Color::black());
}
