use std::time::{Duration, Instant};

use log::{debug, trace};
use nalgebra::{Point3, Unit, Vector3, Vector4};
use rayon::prelude::*;
use thiserror::Error;

use crate::camera::RayField;
use crate::ember::image::{Image, ImageError, SharedImage};
use crate::ember::ray::Ray;
use crate::ember::scene::{Scene, SceneError};
use crate::util::{filled, in_unit_sphere, sequence};
use crate::vec4_to_rgba;

pub mod image;
pub mod ray;
pub mod scene;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to allocate frame buffers for {width}x{height}")]
    Allocation { width: u32, height: u32 },

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("camera provides {actual} ray directions, but the frame has {expected} pixels")]
    RayFieldMismatch { expected: usize, actual: usize },

    #[error("final image lock was poisoned")]
    ImagePoisoned,

    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub accumulate: bool,
    pub bounce_limit: u32,
    /// 발광을 지금까지의 throughput으로 줄일지 여부. 기본값은 줄이지 않음
    pub throughput_weighted_emission: bool,
    // 아래 둘은 에디터에서 값만 바꿀 수 있고 아직 최종 색에는 반영하지 않음
    pub sky_color: Vector3<f32>,
    pub gamma: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            accumulate: true,
            bounce_limit: 5,
            throughput_weighted_emission: false,
            sky_color: Vector3::new(0.75, 0.75, 0.8),
            gamma: 1.2,
        }
    }
}

pub struct Ember {
    final_image: SharedImage,
    image_data: Vec<u32>,
    accumulation: Vec<Vector4<f32>>,
    horizontal_iter: Vec<u32>,
    vertical_iter: Vec<u32>,
    width: u32,
    height: u32,
    frame_index: u32,
    last_render_time: Duration,
    settings: RenderSettings,
}

impl Default for Ember {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl Ember {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            final_image: Image::new(0, 0).shared(),
            image_data: vec![],
            accumulation: vec![],
            horizontal_iter: vec![],
            vertical_iter: vec![],
            width: 0,
            height: 0,
            frame_index: 1,
            last_render_time: Duration::ZERO,
            settings,
        }
    }

    /// 해상도가 바뀌면 버퍼를 새로 잡음. 내용은 버리고 다음 프레임은 1번 샘플부터 시작함.
    /// 할당에 실패하면 이전 버퍼를 그대로 둔 채 에러를 돌려줌
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let final_image = self.final_image.clone();
        let mut image = final_image.write().map_err(|_| RenderError::ImagePoisoned)?;
        let allocation_error = |_: ImageError| RenderError::Allocation { width, height };

        if self.width == width && self.height == height {
            // 화면 쪽에서 이미지 크기를 바꿨을 수도 있음. 누적은 그대로 둠
            return image.resize(width, height).map_err(allocation_error);
        }

        let buffers = (width as usize)
            .checked_mul(height as usize)
            .and_then(|count| {
                Some((
                    filled(count, Vector4::zeros())?,
                    filled(count, 0u32)?,
                    sequence(width)?,
                    sequence(height)?,
                ))
            });
        let Some((accumulation, image_data, horizontal_iter, vertical_iter)) = buffers else {
            return Err(RenderError::Allocation { width, height });
        };

        // 마지막으로 실패할 수 있는 곳. 여기까지는 아무것도 바꾸지 않음
        image.resize(width, height).map_err(allocation_error)?;

        self.accumulation = accumulation;
        self.image_data = image_data;
        self.horizontal_iter = horizontal_iter;
        self.vertical_iter = vertical_iter;
        self.width = width;
        self.height = height;
        self.frame_index = 1;

        debug!("resized frame buffers to {}x{}", width, height);
        Ok(())
    }

    pub fn render<C: RayField>(&mut self, scene: &Scene, camera: &C) -> RenderResult<()> {
        scene.validate()?;

        let actual = camera.ray_directions().len();
        if actual != self.accumulation.len() {
            return Err(RenderError::RayFieldMismatch {
                expected: self.accumulation.len(),
                actual,
            });
        }

        let started = Instant::now();

        // 누적 버퍼를 건드리기 전에 이미지를 잡아둠. 여기서 실패하면 아무것도 바뀌지 않음
        let final_image = self.final_image.clone();
        let mut image = final_image.write().map_err(|_| RenderError::ImagePoisoned)?;
        if image.size() != (self.width, self.height) {
            image
                .resize(self.width, self.height)
                .map_err(|_| RenderError::Allocation {
                    width: self.width,
                    height: self.height,
                })?;
        }

        // 누적을 끄면 매 프레임이 독립된 한 장의 샘플
        if !self.settings.accumulate {
            self.frame_index = 1;
        }
        if self.frame_index == 1 {
            self.accumulation.fill(Vector4::zeros());
        }

        // 픽셀 작업 도중에 &self로 per_pixel을 부르려고 버퍼만 잠깐 빼둠
        let mut accumulation = std::mem::take(&mut self.accumulation);
        let mut image_data = std::mem::take(&mut self.image_data);

        if !accumulation.is_empty() {
            let this = &*self;
            let row = this.width as usize;
            let sample_count = this.frame_index as f32;

            // 한 줄은 정확히 한 작업자만 건드림
            accumulation
                .par_chunks_mut(row)
                .zip(image_data.par_chunks_mut(row))
                .zip(this.vertical_iter.par_iter())
                .for_each(|((path_row, image_row), &y)| {
                    for &x in &this.horizontal_iter {
                        let color = this.per_pixel(scene, camera, x, y);

                        let path = &mut path_row[x as usize];
                        *path += color;

                        let accumulated = (*path / sample_count).map(|c| c.clamp(0.0, 1.0));
                        image_row[x as usize] = vec4_to_rgba(&accumulated);
                    }
                });
        }

        self.accumulation = accumulation;
        self.image_data = image_data;

        // 크기는 위에서 맞춰뒀음
        image.load_image(&self.image_data)?;
        drop(image);

        if self.settings.accumulate {
            self.frame_index = self.frame_index.saturating_add(1);
        } else {
            self.frame_index = 1;
        }

        self.last_render_time = started.elapsed();
        trace!(
            "rendered {}x{} in {:.3}ms",
            self.width,
            self.height,
            self.last_render_time.as_secs_f64() * 1000.0
        );

        Ok(())
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn final_image(&self) -> SharedImage {
        self.final_image.clone()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn last_render_time(&self) -> Duration {
        self.last_render_time
    }

    // DirectX의 RayGen 쉐이더와 같음
    fn per_pixel<C: RayField>(&self, scene: &Scene, camera: &C, x: u32, y: u32) -> Vector4<f32> {
        let index = x as usize + y as usize * self.width as usize;

        let mut ray = Ray::new(camera.position(), camera.ray_directions()[index]);

        let mut light = Vector3::zeros();
        let mut throughput = Vector3::repeat(1.0);

        let mut seed = (index as u32).wrapping_mul(self.frame_index);

        for bounce in 0..self.settings.bounce_limit {
            seed = seed.wrapping_add(bounce);

            let payload = Self::trace_ray(&ray, scene);
            if payload.is_miss() {
                // 하늘은 빛을 내지 않음
                break;
            }

            // render에서 장면을 검증했으니 인덱스는 유효함
            let sphere = &scene.spheres[payload.object_index];
            let material = &scene.materials[sphere.material_index];

            if self.settings.throughput_weighted_emission {
                light += material.emission().component_mul(&throughput);
            } else {
                light += material.emission();
            }
            throughput.component_mul_assign(&material.albedo);

            // 구 표면 바로 위에서 출발하면 자기 자신과 다시 부딪힘. 법선 방향으로 조금 띄움
            ray.origin = payload.world_position + payload.world_normal * 0.0001;
            ray.direction = Unit::new_normalize(payload.world_normal + in_unit_sphere(&mut seed));
        }

        Vector4::new(light.x, light.y, light.z, 1.0)
    }

    pub fn trace_ray(ray: &Ray, scene: &Scene) -> HitPayload {
        // 방향이 0이면 이차식이 성립하지 않음
        let first = ray.direction.magnitude_squared();
        if first == 0.0 || !first.is_finite() {
            return Self::miss();
        }

        let mut closest: Option<(usize, f32)> = None;
        for (index, sphere) in scene.spheres.iter().enumerate() {
            // 반지름이 0 이하(혹은 NaN)인 구는 없는 셈 침
            if sphere.radius.is_nan() || sphere.radius <= 0.0 {
                continue;
            }

            // 구가 원점에 있다고 보고 광선 쪽을 옮겨서 계산함
            // (d·d) t^2 + 2 (o·d) t + (o·o - r^2) = 0
            let origin = ray.origin - sphere.position;

            let second = 2.0 * origin.coords.dot(ray.direction.as_ref());
            let third = origin.coords.magnitude_squared() - sphere.radius * sphere.radius;

            // 판별식
            let discriminant = second * second - 4.0 * first * third;
            if discriminant < 0.0 {
                continue;
            }

            let distance = (-second - discriminant.sqrt()) / (2.0 * first);
            if distance > 0.0 && closest.map_or(true, |(_, previous)| distance < previous) {
                closest = Some((index, distance));
            }
        }

        match closest {
            Some((index, distance)) => Self::closest_hit(ray, distance, index, scene),
            None => Self::miss(),
        }
    }

    fn closest_hit(ray: &Ray, distance: f32, object_index: usize, scene: &Scene) -> HitPayload {
        let sphere = &scene.spheres[object_index];

        let fake_origin = ray.origin - sphere.position;
        let fake_position = fake_origin + ray.direction.as_ref() * distance;

        HitPayload {
            hit_distance: distance,
            world_position: fake_position + sphere.position,
            world_normal: fake_position.coords.normalize(),
            object_index,
        }
    }

    fn miss() -> HitPayload {
        HitPayload {
            hit_distance: -1.0,
            world_position: Point3::origin(),
            world_normal: Vector3::zeros(),
            object_index: 0,
        }
    }
}

// HitPayload는 광선이 어디에 부딪혔는지만 담고, 색은 per_pixel에서 정함
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    /// 음수면 아무것도 맞지 않음
    pub hit_distance: f32,
    pub world_position: Point3<f32>,
    pub world_normal: Vector3<f32>,
    pub object_index: usize,
}

impl HitPayload {
    pub fn is_miss(&self) -> bool {
        self.hit_distance < 0.0
    }
}
