//! 西班牙语排序: 忽略大小写和重音, ñ 排在 n 之后

use std::cmp::Ordering;

/// (主权重, 重音权重, 大小写权重)
fn weight(c: char) -> (u32, u8, u8) {
    let case = u8::from(c.is_uppercase());
    let lower = c.to_lowercase().next().unwrap_or(c);
    let (base, accent) = match lower {
        'á' | 'à' | 'ä' | 'â' => ('a', 1),
        'é' | 'è' | 'ë' | 'ê' => ('e', 1),
        'í' | 'ì' | 'ï' | 'î' => ('i', 1),
        'ó' | 'ò' | 'ö' | 'ô' => ('o', 1),
        'ú' | 'ù' | 'ü' | 'û' => ('u', 1),
        'ç' => ('c', 1),
        other => (other, 0),
    };

    let primary = match base {
        // 空白和标点最前
        c if c.is_whitespace() => 0,
        c if c.is_ascii_punctuation() => 1 + c as u32,
        '0'..='9' => 200 + (base as u32 - '0' as u32),
        'ñ' => 300 + ('n' as u32 - 'a' as u32) * 2 + 1,
        'a'..='z' => 300 + (base as u32 - 'a' as u32) * 2,
        other => 1_000 + other as u32,
    };
    (primary, accent, case)
}

/// 按语言习惯比较两个字符串, 最后按原始字节定序保证全序
pub fn compare(a: &str, b: &str) -> Ordering {
    let wa: Vec<_> = a.trim().chars().map(weight).collect();
    let wb: Vec<_> = b.trim().chars().map(weight).collect();

    let primary = wa.iter().map(|w| w.0).cmp(wb.iter().map(|w| w.0));
    if primary != Ordering::Equal {
        return primary;
    }
    let accents = wa.iter().map(|w| w.1).cmp(wb.iter().map(|w| w.1));
    if accents != Ordering::Equal {
        return accents;
    }
    wa.iter()
        .map(|w| w.2)
        .cmp(wb.iter().map(|w| w.2))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_primary_order() {
        assert_eq!(compare("alquiler", "SIN TIPO"), Ordering::Less);
        assert_eq!(compare("Zapatos", "agua"), Ordering::Greater);
        assert_eq!(compare("abc", "ABC"), Ordering::Less);
    }

    #[test]
    fn accents_sort_with_base_letter() {
        assert_eq!(compare("Área", "Azul"), Ordering::Less);
        assert_eq!(compare("Area", "Área"), Ordering::Less);
        assert_eq!(compare("Arena", "Área"), Ordering::Greater);
        assert_eq!(compare("éxito", "fin"), Ordering::Less);
    }

    #[test]
    fn enye_follows_n() {
        assert_eq!(compare("ñandú", "nube"), Ordering::Greater);
        assert_eq!(compare("ñandú", "oso"), Ordering::Less);
    }

    #[test]
    fn digits_before_letters() {
        assert_eq!(compare("2024-01-05", "A"), Ordering::Less);
        assert_eq!(compare("2024-01-05", "2024-01-10"), Ordering::Less);
    }
}
