use nalgebra::Vector3;

// PCG 계열 해시. 같은 입력이면 언제나 같은 값을 돌려줌
#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// seed를 한 번 해싱해서 갱신하고, 그 값을 [0, 1] 범위의 실수로 바꿈
#[inline]
pub fn random_f32(seed: &mut u32) -> f32 {
    *seed = pcg_hash(*seed);
    *seed as f32 / u32::MAX as f32
}

/// 단위 구 위의 무작위 방향
pub fn in_unit_sphere(seed: &mut u32) -> Vector3<f32> {
    Vector3::new(
        random_f32(seed) * 2.0 - 1.0,
        random_f32(seed) * 2.0 - 1.0,
        random_f32(seed) * 2.0 - 1.0,
    )
    .normalize()
}

// 메모리가 모자라면 None. 중간에 프로세스가 죽지 않게 미리 잡아봄
pub(crate) fn filled<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, value);
    Some(buffer)
}

/// 0..len
pub(crate) fn sequence(len: u32) -> Option<Vec<u32>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len as usize).ok()?;
    buffer.extend(0..len);
    Some(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcg_hash_golden_values() {
        assert_eq!(pcg_hash(42), 1223963391);
        assert_eq!(pcg_hash(0), 129708002);
        assert_eq!(pcg_hash(1), 2831084092);
        assert_eq!(pcg_hash(pcg_hash(42)), 2785308739);
    }

    #[test]
    fn test_pcg_hash_is_pure() {
        for input in [0, 7, 42, u32::MAX] {
            assert_eq!(pcg_hash(input), pcg_hash(input));
        }
    }

    #[test]
    fn test_random_f32_advances_seed() {
        let mut seed = 42;
        let value = random_f32(&mut seed);

        assert_eq!(seed, 1223963391);
        assert!((0.0..=1.0).contains(&value));
    }

    #[test]
    fn test_random_f32_sequence_is_reproducible() {
        let mut first = 1234;
        let mut second = 1234;

        let a: Vec<f32> = (0..64).map(|_| random_f32(&mut first)).collect();
        let b: Vec<f32> = (0..64).map(|_| random_f32(&mut second)).collect();

        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_in_unit_sphere_is_normalized() {
        let mut seed = 99;
        for _ in 0..256 {
            let v = in_unit_sphere(&mut seed);
            assert!((v.magnitude() - 1.0).abs() < 1e-4, "length was {}", v.magnitude());
        }
    }

    #[test]
    fn test_filled_and_sequence() {
        assert_eq!(filled(3, 7u32), Some(vec![7, 7, 7]));
        assert_eq!(sequence(4), Some(vec![0, 1, 2, 3]));
        assert_eq!(sequence(0), Some(vec![]));
    }

    #[test]
    fn test_filled_reports_impossible_sizes() {
        assert_eq!(filled(usize::MAX, 0u64), None);
    }
}
