//! Static vocabularies for the bilingual name pipeline: stopwords,
//! marketing noise, color/material/unit word lists, and a
//! traditional→simplified character table.

use std::collections::HashSet;
use std::sync::LazyLock;

/// General Chinese stopwords plus promotional terms that carry no product
/// identity ("genuine", "free shipping", "flash sale" and friends).
pub static CHINESE_STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上",
        "也", "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
        "那", "现在", "可以", "但是", "因为", "所以", "如果", "虽然", "然后", "还是", "或者",
        "已经", "应该", "可能", "只是",
        "正品", "包邮", "特价", "促销", "折扣", "优惠", "限时", "秒杀", "抢购", "新品", "热销",
    ]
    .into_iter()
    .collect()
});

/// Product-marketing stopwords: storefront boilerplate that appears in
/// listings on every platform and never distinguishes one product from
/// another.
pub static PRODUCT_STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "商品", "产品", "物品", "货物", "东西", "用品", "器具", "设备", "装置", "工具", "配件",
        "正品", "全新", "原装", "品牌", "专柜", "官方", "授权", "直营", "旗舰店", "专营店",
        "包邮", "现货", "库存", "有货", "缺货", "预售", "定制",
    ]
    .into_iter()
    .collect()
});

/// Latin-script filler words dropped by the Latin normalization path.
pub static LATIN_FILLERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ["new", "original", "genuine", "official", "brand", "item"]
        .into_iter()
        .collect()
});

/// Color vocabulary for feature extraction.
pub static COLORS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "黑", "白", "红", "蓝", "绿", "黄", "紫", "粉", "灰", "橙", "棕", "银", "金",
        "黑色", "白色", "红色", "蓝色", "绿色", "黄色", "紫色", "粉色", "灰色", "橙色",
        "棕色", "银色", "金色", "透明", "彩色",
    ]
    .into_iter()
    .collect()
});

/// Material vocabulary for feature extraction.
pub static MATERIALS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "塑料", "金属", "不锈钢", "铝合金", "碳纤维", "玻璃", "陶瓷", "硅胶", "橡胶",
        "皮革", "真皮", "人造革", "布料", "棉", "丝绸", "尼龙", "聚酯", "木质", "竹制",
    ]
    .into_iter()
    .collect()
});

/// Unit suffixes that follow a number inside one token ("256gb", "500ml").
/// The unit fragment is dropped when Latin tokens are split at digit/letter
/// boundaries so "256GB" and "256G" both normalize to "256".
pub static UNIT_SUFFIXES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "g", "gb", "tb", "mb", "kb", "kg", "mg", "lb", "oz", "ml", "l", "mm", "cm", "m",
        "km", "w", "kw", "v", "mv", "a", "ma", "mah", "hz", "khz", "mhz", "ghz", "k",
        "in", "inch", "ft", "px", "mp", "fps", "rpm", "pcs", "pc", "x",
    ]
    .into_iter()
    .collect()
});

/// Traditional→simplified character pairs covering the variants commonly
/// seen in marketplace listings. Characters outside the table pass through
/// unchanged.
static TRAD_TO_SIMP: &[(char, char)] = &[
    ('東', '东'), ('買', '买'), ('賣', '卖'), ('價', '价'), ('錢', '钱'), ('貨', '货'),
    ('員', '员'), ('門', '门'), ('開', '开'), ('關', '关'), ('長', '长'), ('風', '风'),
    ('車', '车'), ('馬', '马'), ('鳥', '鸟'), ('魚', '鱼'), ('龍', '龙'), ('書', '书'),
    ('畫', '画'), ('筆', '笔'), ('紙', '纸'), ('點', '点'), ('熱', '热'), ('燈', '灯'),
    ('專', '专'), ('業', '业'), ('廠', '厂'), ('廣', '广'), ('應', '应'), ('華', '华'),
    ('為', '为'), ('樂', '乐'), ('聲', '声'), ('記', '记'), ('臺', '台'), ('灣', '湾'),
    ('國', '国'), ('產', '产'), ('發', '发'), ('變', '变'), ('頭', '头'), ('顯', '显'),
    ('鏡', '镜'), ('線', '线'), ('級', '级'), ('純', '纯'), ('絲', '丝'), ('織', '织'),
    ('褲', '裤'), ('裝', '装'), ('飾', '饰'), ('錶', '表'), ('鐘', '钟'), ('殼', '壳'),
    ('優', '优'), ('贈', '赠'), ('現', '现'), ('實', '实'), ('藍', '蓝'), ('紅', '红'),
    ('綠', '绿'), ('黃', '黄'), ('銀', '银'), ('鐵', '铁'), ('鋼', '钢'), ('機', '机'),
    ('電', '电'), ('腦', '脑'), ('視', '视'), ('數', '数'), ('質', '质'), ('體', '体'),
    ('無', '无'), ('網', '网'), ('遊', '游'), ('戲', '戏'), ('運', '运'), ('動', '动'),
    ('鞋', '鞋'), ('襯', '衬'), ('雙', '双'), ('兒', '儿'), ('童', '童'), ('套', '套'),
];

/// Map traditional variants to their simplified forms, character by
/// character. Not a full converter — covers the product-listing vocabulary
/// the collectors actually encounter.
pub fn to_simplified(text: &str) -> String {
    text.chars()
        .map(|c| {
            TRAD_TO_SIMP
                .iter()
                .find(|(t, _)| *t == c)
                .map(|(_, s)| *s)
                .unwrap_or(c)
        })
        .collect()
}

/// True when the token is in either Chinese stopword set.
pub fn is_stopword(token: &str) -> bool {
    CHINESE_STOPWORDS.contains(token) || PRODUCT_STOPWORDS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplification_maps_known_variants() {
        assert_eq!(to_simplified("藍牙耳機"), "蓝牙耳机");
        assert_eq!(to_simplified("正品"), "正品");
    }

    #[test]
    fn marketing_terms_are_stopwords() {
        assert!(is_stopword("正品"));
        assert!(is_stopword("包邮"));
        assert!(is_stopword("旗舰店"));
        assert!(!is_stopword("耳机"));
    }
}
