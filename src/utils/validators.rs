// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use thiserror::Error;

/// 验证错误类型
#[derive(Error, Debug)]
pub enum ValidationError {
    /// 号码无效
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
}

/// 规范化电话号码为国际纯数字形式
///
/// 去掉 `+` 前缀与所有非数字字符；结果必须是9到15位数字。
/// 在已接受的子集上幂等且稳定
///
/// # 参数
///
/// * `raw` - 原始号码输入
///
/// # 返回值
///
/// * `Ok(String)` - 规范化后的纯数字号码
/// * `Err(ValidationError)` - 号码不满足 9-15 位数字
pub fn normalize_phone(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 9 || digits.len() > 15 {
        return Err(ValidationError::InvalidPhoneNumber(raw.to_string()));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_plus_and_separators() {
        assert_eq!(
            normalize_phone("+964 781-234-5678").unwrap(),
            "9647812345678"
        );
        assert_eq!(normalize_phone("9647812345678").unwrap(), "9647812345678");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_phone("+9647812345678").unwrap();
        let twice = normalize_phone(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_out_of_range_lengths() {
        assert!(normalize_phone("12345678").is_err()); // 8位
        assert!(normalize_phone("1234567890123456").is_err()); // 16位
        assert!(normalize_phone("abc").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn test_boundary_lengths_accepted() {
        assert!(normalize_phone("123456789").is_ok()); // 9位
        assert!(normalize_phone("123456789012345").is_ok()); // 15位
    }
}
