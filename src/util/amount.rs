use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// 金额格式: 千分位分隔符 + 小数点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub thousands_separator: String,
    pub decimal_separator: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

/// 解析金额字符串: 去掉千分位和空白, 无法解析时按 0 计
pub fn parse_amount(raw: &str) -> BigDecimal {
    try_parse_amount(raw).unwrap_or_else(BigDecimal::zero)
}

/// 严格解析: 空串为 0, 非数字返回 None
pub fn try_parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return Some(BigDecimal::zero());
    }
    BigDecimal::from_str(&cleaned).ok()
}

/// |value| < 1e-9 视为零
pub fn is_near_zero(value: &BigDecimal) -> bool {
    let epsilon = BigDecimal::new(1.into(), 9);
    value.abs() < epsilon
}

/// 四舍五入 (远离零) 到指定小数位
pub fn round_half_up(value: &BigDecimal, places: i64) -> BigDecimal {
    let half = BigDecimal::new(5.into(), places + 1);
    let adjusted = if *value < BigDecimal::zero() {
        value - &half
    } else {
        value + &half
    };
    // with_scale 向零截断
    adjusted.with_scale(places)
}

/// 两位小数的纯文本表示 (无千分位), 如 "-1234.50"
pub fn to_fixed2(value: &BigDecimal) -> String {
    let rounded = round_half_up(value, 2);
    let text = rounded.to_string();
    if text == "-0.00" {
        "0.00".to_string()
    } else {
        text
    }
}

/// 两位小数 + 千分位, 如 "1,234,567.89"
pub fn format_amount(value: &BigDecimal, fmt: &NumberFormat) -> String {
    let plain = to_fixed2(value);
    let (negative, digits) = match plain.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, plain.as_str()),
    };
    let (int_part, dec_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 * 2);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push_str(&fmt.thousands_separator);
        }
        grouped.push(ch);
    }

    format!(
        "{}{}{}{}",
        if negative { "-" } else { "" },
        grouped,
        fmt.decimal_separator,
        dec_part
    )
}

/// 按币种分别累计的金额, 币种按代码排序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrencyTotals {
    totals: BTreeMap<String, BigDecimal>,
}

impl CurrencyTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, currency: &str, amount: &BigDecimal) {
        let entry = self
            .totals
            .entry(currency.to_string())
            .or_insert_with(BigDecimal::zero);
        *entry = &*entry + amount;
    }

    pub fn merge(&mut self, other: &CurrencyTotals) {
        for (currency, amount) in &other.totals {
            self.add(currency, amount);
        }
    }

    /// 每个币种取反
    pub fn negated(&self) -> CurrencyTotals {
        Self {
            totals: self
                .totals
                .iter()
                .map(|(c, v)| (c.clone(), -v.clone()))
                .collect(),
        }
    }

    /// self - other, 覆盖两边出现的所有币种
    pub fn minus(&self, other: &CurrencyTotals) -> CurrencyTotals {
        let mut result = self.clone();
        result.merge(&other.negated());
        result
    }

    pub fn get(&self, currency: &str) -> BigDecimal {
        self.totals
            .get(currency)
            .cloned()
            .unwrap_or_else(BigDecimal::zero)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BigDecimal)> {
        self.totals.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// 单一币种时返回其金额
    pub fn single(&self) -> Option<&BigDecimal> {
        if self.totals.len() == 1 {
            self.totals.values().next()
        } else {
            None
        }
    }

    /// 多币种文本: "CRC 1,000.00 / USD 50.00"
    pub fn labeled(&self, fmt: &NumberFormat) -> String {
        self.totals
            .iter()
            .map(|(currency, amount)| format!("{} {}", currency, format_amount(amount, fmt)))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}
