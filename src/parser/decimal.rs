//! 循環小数の補正。
//!
//! 基盤地図情報の隅座標は `34.111111` のように途中で打ち切られた循環小数で
//! 記録されている。そのまま読むとセルサイズに誤差が乗り、タイル全体で
//! 1セル未満のずれが積み重なる。
//!
//! 同じ文字が一定回数以上連続していたら、その文字が無限に続くものとみなして
//! 桁を補う。これは近似であり、`0.142857142857` のような複数桁の循環節は
//! 検出しない。

use std::borrow::Cow;

use crate::error::{DemError, Result};

/// 循環とみなす連続回数
pub const MIN_REPEAT: usize = 6;

/// 補う桁数
const EXTRA_DIGITS: usize = 10;

/// 循環小数を補正した文字列を返す。補正不要ならそのまま返す。
pub fn repair_decimal(val: &str) -> Cow<'_, str> {
    repair_decimal_with(val, MIN_REPEAT)
}

pub fn repair_decimal_with(val: &str, min_repeat: usize) -> Cow<'_, str> {
    let mut repeat = 0;
    let mut last = None;

    for (i, c) in val.char_indices() {
        if last == Some(c) {
            repeat += 1;
            if repeat == min_repeat {
                // 連続の終わりで切り、同じ文字を追加する
                let end = i + c.len_utf8();
                let mut repaired = String::with_capacity(end + EXTRA_DIGITS);
                repaired.push_str(&val[..end]);
                repaired.extend(std::iter::repeat(c).take(EXTRA_DIGITS));
                return Cow::Owned(repaired);
            }
        } else {
            last = Some(c);
            repeat = 1;
        }
    }

    Cow::Borrowed(val)
}

/// 循環小数を補正してから浮動小数点数として読む
pub fn float2(val: &str) -> Result<f64> {
    let repaired = repair_decimal(val.trim());
    repaired
        .parse::<f64>()
        .map_err(|e| DemError::malformed(format!("invalid coordinate {:?}: {}", val, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeating_decimal_is_extended() {
        assert_eq!(repair_decimal("34.111111"), "34.1111111111111111");

        let value = float2("34.111111").unwrap();
        assert_eq!(value, "34.1111111111111111".parse::<f64>().unwrap());
        assert!((value - 34.0 - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_run_is_parsed_literally() {
        assert!(matches!(repair_decimal("34.12"), Cow::Borrowed("34.12")));
        assert_eq!(float2("34.12").unwrap(), 34.12);
        assert_eq!(float2("1.5").unwrap(), 1.5);
    }

    #[test]
    fn test_zero_run_triggers_repair() {
        assert_eq!(repair_decimal("0.000000"), "0.0000000000000000");
        assert_eq!(float2("0.000000").unwrap(), 0.0);
    }

    #[test]
    fn test_string_is_cut_at_end_of_run() {
        // 連続の後ろの桁は捨てられる
        assert_eq!(repair_decimal("35.6666667"), "35.6666666666666666");
        assert_eq!(repair_decimal("34.1111112"), "34.1111111111111111");
    }

    #[test]
    fn test_run_counter_resets_on_change() {
        // 小数点をまたいで連続は数えない
        assert!(matches!(repair_decimal("111.111"), Cow::Borrowed(_)));
        assert!(matches!(repair_decimal("11111"), Cow::Borrowed(_)));
        assert!(matches!(repair_decimal("1212121212"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_multi_digit_cycle_is_not_detected() {
        assert!(matches!(repair_decimal("0.142857142857"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_custom_threshold() {
        assert_eq!(repair_decimal_with("1.222", 3), "1.2222222222222");
    }

    #[test]
    fn test_invalid_coordinate() {
        let err = float2("abc").unwrap_err();
        assert!(matches!(err, DemError::MalformedDocument(_)));
    }
}
