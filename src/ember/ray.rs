use nalgebra::{Point3, Unit, Vector3};

// direction은 카메라가 정규화해서 넘겨준다고 가정함. 여기서 다시 정규화하지 않음
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Unit<Vector3<f32>>) -> Self {
        Self { origin, direction }
    }
}
