//! Migration files compiled into the binary, one set per database system.
//! Keep these lists in sync with `db/migrations/<system>/`.

pub static POSTGRES: &[(&str, &str)] = &[
    (
        "1_assets.sql",
        include_str!("../../../db/migrations/postgres/1_assets.sql"),
    ),
    (
        "2_asset_content_index.sql",
        include_str!("../../../db/migrations/postgres/2_asset_content_index.sql"),
    ),
];
