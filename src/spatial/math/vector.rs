use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Sub, SubAssign};

#[derive(Default, Clone, Copy, Debug, Eq, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
#[repr(C)]
pub struct V3c<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Copy> V3c<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
    pub fn unit(scale: T) -> Self {
        Self {
            x: scale,
            y: scale,
            z: scale,
        }
    }
}

impl<T> Index<usize> for V3c<T> {
    type Output = T;
    fn index(&self, axis: usize) -> &T {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Invalid axis {axis} for 3 dimensional vector!"),
        }
    }
}

impl<T> IndexMut<usize> for V3c<T> {
    fn index_mut(&mut self, axis: usize) -> &mut T {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Invalid axis {axis} for 3 dimensional vector!"),
        }
    }
}

impl<T> V3c<T>
where
    T: num_traits::Signed + Copy,
{
    pub fn abs(self) -> Self {
        V3c::new(self.x.abs(), self.y.abs(), self.z.abs())
    }
}

impl<T> V3c<T>
where
    T: num_traits::Float,
{
    pub fn floor(self) -> Self {
        V3c::new(self.x.floor(), self.y.floor(), self.z.floor())
    }

    pub fn min_component(&self) -> T {
        self.x.min(self.y).min(self.z)
    }

    pub fn max_component(&self) -> T {
        self.x.max(self.y).max(self.z)
    }
}

impl V3c<f32> {
    pub fn length(&self) -> f32 {
        ((self.x * self.x) + (self.y * self.y) + (self.z * self.z)).sqrt()
    }

    pub fn normalized(self) -> V3c<f32> {
        self / self.length()
    }

    /// Sign of each component, where an exact zero stays zero.
    /// `f32::signum` maps `0.0` to `1.0`, which would turn a ray that never
    /// crosses a plane on an axis into one moving forward on it.
    pub fn sign_or_zero(&self) -> V3c<i32> {
        V3c::new(
            (self.x > 0.) as i32 - (self.x < 0.) as i32,
            (self.y > 0.) as i32 - (self.y < 0.) as i32,
            (self.z > 0.) as i32 - (self.z < 0.) as i32,
        )
    }
}

impl<T> V3c<T>
where
    T: Mul<Output = T> + Sub<Output = T> + Copy,
{
    pub fn cross(self, other: V3c<T>) -> V3c<T> {
        V3c {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

impl<T: Add<Output = T>> Add for V3c<T> {
    type Output = V3c<T>;

    fn add(self, other: V3c<T>) -> V3c<T> {
        V3c {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl<T> Sub for V3c<T>
where
    T: Copy + Sub<Output = T>,
{
    type Output = V3c<T>;

    fn sub(self, other: V3c<T>) -> V3c<T> {
        V3c {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl<T> AddAssign for V3c<T>
where
    T: Copy + Add<Output = T>,
{
    fn add_assign(&mut self, other: V3c<T>) {
        *self = *self + other;
    }
}

impl<T> SubAssign for V3c<T>
where
    T: Copy + Sub<Output = T>,
{
    fn sub_assign(&mut self, other: V3c<T>) {
        *self = *self - other;
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for V3c<T> {
    type Output = V3c<T>;

    fn mul(self, scalar: T) -> V3c<T> {
        V3c {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl<T: Mul<Output = T> + Copy> Mul<V3c<T>> for V3c<T> {
    type Output = V3c<T>;

    fn mul(self, other: V3c<T>) -> V3c<T> {
        V3c {
            x: self.x * other.x,
            y: self.y * other.y,
            z: self.z * other.z,
        }
    }
}

impl<T: Div<Output = T> + Copy> Div<T> for V3c<T> {
    type Output = V3c<T>;

    fn div(self, scalar: T) -> V3c<T> {
        V3c {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl<T: Div<Output = T> + Copy> Div<V3c<T>> for V3c<T> {
    type Output = V3c<T>;

    fn div(self, other: V3c<T>) -> V3c<T> {
        V3c {
            x: self.x / other.x,
            y: self.y / other.y,
            z: self.z / other.z,
        }
    }
}

impl From<V3c<i32>> for V3c<f32> {
    fn from(vec: V3c<i32>) -> V3c<f32> {
        V3c::new(vec.x as f32, vec.y as f32, vec.z as f32)
    }
}

impl From<V3c<u32>> for V3c<f32> {
    fn from(vec: V3c<u32>) -> V3c<f32> {
        V3c::new(vec.x as f32, vec.y as f32, vec.z as f32)
    }
}

impl From<[f32; 3]> for V3c<f32> {
    fn from(vec: [f32; 3]) -> V3c<f32> {
        V3c::new(vec[0], vec[1], vec[2])
    }
}

/// Truncates towards negative infinity, so values inside a cell map to that cell
impl From<V3c<f32>> for V3c<i32> {
    fn from(vec: V3c<f32>) -> V3c<i32> {
        V3c::new(
            vec.x.floor() as i32,
            vec.y.floor() as i32,
            vec.z.floor() as i32,
        )
    }
}

impl From<V3c<u32>> for V3c<i32> {
    fn from(vec: V3c<u32>) -> V3c<i32> {
        V3c::new(vec.x as i32, vec.y as i32, vec.z as i32)
    }
}

impl From<V3c<i32>> for V3c<u32> {
    fn from(vec: V3c<i32>) -> V3c<u32> {
        V3c::new(vec.x as u32, vec.y as u32, vec.z as u32)
    }
}
