use nalgebra::{Isometry3, Perspective3, Point3, Unit, Vector3};
use rayon::prelude::*;

/// 렌더러가 카메라에서 필요로 하는 것: 위치와 픽셀마다 미리 계산된 광선 방향.
/// 방향 배열은 `x + y * width` 순서이고 각 방향은 단위 벡터여야 함.
pub trait RayField: Sync {
    fn position(&self) -> Point3<f32>;
    fn ray_directions(&self) -> &[Unit<Vector3<f32>>];
}

// 입력 처리는 바깥(에디터)의 몫. 여기서는 광선 배열만 만든다
pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    rays: Vec<Unit<Vector3<f32>>>,

    width: u32,
    height: u32,
}

impl Camera {
    /// `vertical_fov`는 도(degree) 단위
    pub fn new(vertical_fov: f32, near: f32, far: f32, width: u32, height: u32) -> Self {
        let vertical_fov = vertical_fov.to_radians();
        let position = Point3::new(0.0, 0.0, 6.0);
        let forward = Unit::new_normalize(Vector3::new(0.0, 0.0, -1.0));

        let mut to_return = Self {
            projection: Perspective3::new(aspect(width, height), vertical_fov, near, far),
            view: Isometry3::identity(),
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            width,
            height,
        };

        to_return.reevaluate_view();
        to_return.reevaluate_rays();

        to_return
    }

    pub fn look_at(&mut self, position: Point3<f32>, target: Point3<f32>) {
        let Some(forward) = Unit::try_new(target - position, f32::EPSILON) else {
            log::warn!("camera target coincides with its position, keeping the old direction");
            return;
        };

        self.position = position;
        self.forward = forward;

        self.reevaluate_view();
        self.reevaluate_rays();
    }

    /// 크기가 실제로 바뀌었을 때만 true
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }

        self.width = width;
        self.height = height;

        self.reevaluate_projection();
        self.reevaluate_rays();

        true
    }

    pub fn forward(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    fn reevaluate_projection(&mut self) {
        self.projection = Perspective3::new(
            aspect(self.width, self.height),
            self.vertical_fov,
            self.near,
            self.far,
        );
    }

    fn reevaluate_view(&mut self) {
        let target = self.position + self.forward.into_inner();

        // 카메라가 정확히 위/아래를 보면 y축을 up으로 쓸 수 없음
        let up = if self.forward.cross(&Vector3::y()).norm_squared() < 1e-6 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        self.view = Isometry3::look_at_rh(&self.position, &target, &up);
    }

    fn reevaluate_rays(&mut self) {
        let width = self.width;
        let height = self.height;
        let projection = &self.projection;
        let view = &self.view;

        // y = 0 이 화면 아래쪽
        self.rays = (0..width as usize * height as usize)
            .into_par_iter()
            .map(|index| {
                let x = (index % width as usize) as f32;
                let y = (index / width as usize) as f32;

                let coord_x = x / width as f32 * 2.0 - 1.0;
                let coord_y = y / height as f32 * 2.0 - 1.0;

                // 원근 투영의 먼 평면 위의 점. 카메라 공간에서는 -z 쪽을 봄
                let target = projection.unproject_point(&Point3::new(coord_x, coord_y, 1.0));
                let direction = target.coords.normalize();

                Unit::new_normalize(view.inverse_transform_vector(&direction))
            })
            .collect();
    }
}

impl RayField for Camera {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn ray_directions(&self) -> &[Unit<Vector3<f32>>] {
        &self.rays
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_count_matches_viewport() {
        let mut camera = Camera::new(45.0, 0.1, 100.0, 16, 9);
        assert_eq!(camera.ray_directions().len(), 16 * 9);

        assert!(camera.resize(4, 3));
        assert!(!camera.resize(4, 3));
        assert_eq!(camera.ray_directions().len(), 12);
    }

    #[test]
    fn test_rays_are_unit_length() {
        let camera = Camera::new(45.0, 0.1, 100.0, 8, 8);

        for direction in camera.ray_directions() {
            assert!((direction.norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_center_ray_follows_forward() {
        let mut camera = Camera::new(60.0, 0.1, 100.0, 2, 2);
        camera.look_at(Point3::new(0.0, 0.0, 5.0), Point3::origin());

        // 2x2에서 (1, 1)은 정확히 화면 중앙
        let center = camera.ray_directions()[3];
        assert!((center.into_inner() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-4);
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_bottom_row_points_down() {
        let camera = Camera::new(45.0, 0.1, 100.0, 4, 4);
        let rays = camera.ray_directions();

        assert!(rays[0].y < 0.0);
        assert!(rays[rays.len() - 1].y > 0.0);
    }

    #[test]
    fn test_look_at_ignores_degenerate_target() {
        let mut camera = Camera::new(45.0, 0.1, 100.0, 2, 2);
        let before = camera.forward();

        camera.look_at(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));

        assert_eq!(camera.forward(), before);
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 6.0));
    }
}
