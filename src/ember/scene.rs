use nalgebra::Vector3;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("sphere {sphere} refers to material {material_index}, but the scene only has {material_count} materials")]
    MissingMaterial {
        sphere: usize,
        material_index: usize,
        material_count: usize,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 재질의 인덱스를 돌려줌
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// 존재하지 않는 재질을 가리키는 구는 받지 않음
    pub fn add_sphere(&mut self, sphere: Sphere) -> SceneResult<usize> {
        self.check_sphere(self.spheres.len(), &sphere)?;
        self.spheres.push(sphere);
        Ok(self.spheres.len() - 1)
    }

    /// 에디터가 필드를 직접 고친 뒤 렌더링 전에 한 번 호출할 것
    pub fn validate(&self) -> SceneResult<()> {
        self.spheres
            .iter()
            .enumerate()
            .try_for_each(|(index, sphere)| self.check_sphere(index, sphere))
    }

    fn check_sphere(&self, index: usize, sphere: &Sphere) -> SceneResult<()> {
        if sphere.material_index < self.materials.len() {
            Ok(())
        } else {
            Err(SceneError::MissingMaterial {
                sphere: index,
                material_index: sphere.material_index,
                material_count: self.materials.len(),
            })
        }
    }

    // 원래 앱에서 쓰던 장면 그대로
    pub fn demo() -> Self {
        let mut scene = Self::new();

        let pink = scene.add_material(Material {
            albedo: Vector3::new(0.9, 0.0, 0.1),
            roughness: 0.1,
            ..Default::default()
        });
        let green = scene.add_material(Material {
            albedo: Vector3::new(0.2, 0.8, 0.2),
            roughness: 0.35,
            ..Default::default()
        });
        // 주황색: 발광체
        scene.add_material(Material {
            albedo: Vector3::new(0.8, 0.2, 0.1),
            roughness: 0.35,
            emission_color: Vector3::new(0.8, 0.2, 0.1),
            emission_power: 15.0,
            ..Default::default()
        });
        let blue = scene.add_material(Material {
            albedo: Vector3::new(0.1, 0.2, 0.9),
            roughness: 0.05,
            metallic: true,
            ..Default::default()
        });
        let yellow = scene.add_material(Material {
            albedo: Vector3::new(1.0, 0.9, 0.1),
            roughness: 0.6,
            ..Default::default()
        });
        let purple = scene.add_material(Material {
            albedo: Vector3::new(0.5, 0.0, 0.8),
            roughness: 0.2,
            emission_color: Vector3::new(0.5, 0.0, 0.8),
            emission_power: 10.0,
            ..Default::default()
        });
        let cyan = scene.add_material(Material {
            albedo: Vector3::new(0.0, 0.9, 0.9),
            roughness: 0.15,
            ..Default::default()
        });

        let spheres = [
            (Vector3::new(-2.5, 0.0, 0.0), 1.0, blue),
            (Vector3::new(5.0, 0.0, 0.0), 1.0, yellow),
            (Vector3::new(-5.0, 0.0, 0.0), 1.0, purple),
            (Vector3::new(2.5, 0.0, 0.0), 1.0, cyan),
            (Vector3::new(0.0, 0.0, 0.0), 1.0, pink),
            // 바닥
            (Vector3::new(0.0, -101.0, 0.0), 100.0, green),
        ];

        // 위에서 만든 재질만 쓰니 실패할 수 없음
        scene.spheres.extend(
            spheres
                .into_iter()
                .map(|(position, radius, material_index)| Sphere {
                    position,
                    radius,
                    material_index,
                }),
        );

        scene
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub position: Vector3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

// roughness, metallic은 에디터에서 값만 들고 있음. 아직 렌더링에는 쓰지 않음
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub roughness: f32,
    pub metallic: bool,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: false,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emission_is_color_times_power() {
        let material = Material {
            emission_color: Vector3::new(0.5, 0.25, 1.0),
            emission_power: 4.0,
            ..Default::default()
        };

        assert_eq!(material.emission(), Vector3::new(2.0, 1.0, 4.0));
        assert_eq!(Material::default().emission(), Vector3::zeros());
    }

    #[test]
    fn test_add_sphere_rejects_missing_material() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());

        assert_eq!(scene.add_sphere(Sphere::default()), Ok(0));

        let error = scene
            .add_sphere(Sphere {
                material_index: 3,
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(
            error,
            SceneError::MissingMaterial {
                sphere: 1,
                material_index: 3,
                material_count: 1,
            }
        );
        assert_eq!(scene.spheres.len(), 1);
    }

    #[test]
    fn test_validate_catches_edited_index() {
        let mut scene = Scene::demo();
        assert!(scene.validate().is_ok());

        scene.spheres[2].material_index = scene.materials.len();
        assert!(matches!(
            scene.validate(),
            Err(SceneError::MissingMaterial { sphere: 2, .. })
        ));
    }

    #[test]
    fn test_empty_scene_is_valid() {
        assert!(Scene::new().validate().is_ok());
    }

    #[test]
    fn test_demo_scene_layout() {
        let scene = Scene::demo();

        assert_eq!(scene.materials.len(), 7);
        assert_eq!(scene.spheres.len(), 6);

        let ground = &scene.spheres[5];
        assert_eq!(ground.radius, 100.0);
        assert_eq!(ground.position, Vector3::new(0.0, -101.0, 0.0));

        let emissive = scene
            .materials
            .iter()
            .filter(|material| material.emission_power > 0.0)
            .count();
        assert_eq!(emissive, 2);
    }
}
