/// 税种代码 -> 名称
fn tax_name(code: &str) -> Option<&'static str> {
    Some(match code {
        "01" => "IVA",
        "02" => "Selectivo de consumo",
        "03" => "Único a combustibles",
        "04" => "Bebidas alcohólicas",
        "05" => "Bebidas sin alcohol y jabones",
        "06" => "Tabaco",
        "07" => "IVA cálculo especial",
        "08" => "IVA bienes usados",
        "12" => "Cemento",
        "99" => "Otros",
        _ => return None,
    })
}

/// IVA 税率代码 -> (显示名, 百分比)
fn rate_info(rate_code: &str) -> Option<(&'static str, &'static str)> {
    Some(match rate_code {
        "01" => ("0%", "0"),
        "02" => ("1%", "1"),
        "03" => ("2%", "2"),
        "04" => ("4%", "4"),
        "05" => ("transitorio 0%", "0"),
        "06" => ("transitorio 4%", "4"),
        "07" => ("transitorio 8%", "8"),
        "08" => ("13%", "13"),
        "09" => ("0.5%", "0.5"),
        "10" => ("exento", "0"),
        "11" => ("0% sin crédito", "0"),
        _ => return None,
    })
}

/// 税率代码对应的百分比
pub fn rate_percent_for(rate_code: &str) -> Option<&'static str> {
    rate_info(rate_code).map(|(_, pct)| pct)
}

/// 税额列标题: "IVA 13% (01/08)"
pub fn tax_column_label(tax_code: &str, rate_code: &str) -> String {
    let name = tax_name(tax_code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Impuesto {}", display_code(tax_code)));

    let rate = if rate_code.is_empty() {
        None
    } else {
        Some(
            rate_info(rate_code)
                .map(|(label, _)| label.to_string())
                .unwrap_or_else(|| format!("tarifa {}", rate_code)),
        )
    };

    match rate {
        Some(rate) => format!("{} {} ({}/{})", name, rate, display_code(tax_code), rate_code),
        None => format!("{} ({})", name, display_code(tax_code)),
    }
}

fn display_code(code: &str) -> &str {
    if code.is_empty() {
        "?"
    } else {
        code
    }
}
