pub mod clock;
pub mod ip;
pub mod time;
pub mod url_validator;

pub use clock::{Clock, ManualClock, SystemClock};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    // 随机选择字母和数字
    iter::repeat_with(|| CODE_ALPHABET[rand::random_range(0..CODE_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

/// Source of short-code candidates. Uniqueness is the caller's job.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Fixed-length alphanumeric codes drawn from the thread-local RNG.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(6)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_random_code(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_random_code_length_and_alphabet() {
        for len in [1, 6, 32] {
            let code = generate_random_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_generator_is_not_deterministic() {
        let generator = RandomCodeGenerator::new(6);
        let codes: HashSet<String> = (0..50).map(|_| generator.generate()).collect();
        // 62^6 种组合，50 次全部相同的概率可以忽略
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_zero_length_is_clamped() {
        let generator = RandomCodeGenerator::new(0);
        assert_eq!(generator.length(), 1);
        assert_eq!(generator.generate().len(), 1);
    }
}
