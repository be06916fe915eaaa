//! ## Housing Catalog
//!
//! The directive tables for the residential sales dataset (one row per sold house,
//! `SalePrice` as the modeling target). Version `1`.

use super::{lookup, ConsistencyRule, Directive, DirectiveCatalog, OrdinalScale, Sentinel};
use crate::settings::ABSENT_LABEL;

pub const CATALOG_NAME: &str = "housing";
pub const CATALOG_VERSION: &str = "1";

/// Identifier and near-constant or mostly-missing columns removed before deduplication.
pub const DROPPED_COLUMNS: [&str; 5] = ["Id", "Alley", "Street", "Utilities", "Condition2"];

/// Categorical columns where a missing value means the feature is not present.
pub const ABSENT_FEATURE_COLUMNS: [&str; 13] = [
    "BsmtQual",
    "BsmtCond",
    "BsmtExposure",
    "BsmtFinType1",
    "BsmtFinType2",
    "FireplaceQu",
    "GarageType",
    "GarageFinish",
    "GarageQual",
    "GarageCond",
    "PoolQC",
    "Fence",
    "MiscFeature",
];

/// Numeric codes that are nominal rather than magnitudes. `GarageYrBlt` uses 0 for "no garage".
pub const NOMINAL_CODE_COLUMNS: [&str; 4] = ["MSSubClass", "MoSold", "YrSold", "GarageYrBlt"];

/// Unordered categorical columns expanded into indicators.
pub const NOMINAL_COLUMNS: [&str; 23] = [
    "MSSubClass",
    "MSZoning",
    "LotShape",
    "LandContour",
    "LotConfig",
    "Neighborhood",
    "Condition1",
    "BldgType",
    "HouseStyle",
    "RoofStyle",
    "RoofMatl",
    "Exterior1st",
    "Exterior2nd",
    "MasVnrType",
    "Foundation",
    "Heating",
    "CentralAir",
    "Electrical",
    "GarageYrBlt",
    "MoSold",
    "YrSold",
    "SaleType",
    "SaleCondition",
];

fn quality_scale() -> OrdinalScale {
    OrdinalScale::new(&[("Po", 1), ("Fa", 2), ("TA", 3), ("Gd", 4), ("Ex", 5)])
}

fn absent_quality_scale() -> OrdinalScale {
    OrdinalScale::new(&[
        (ABSENT_LABEL, 0),
        ("Po", 1),
        ("Fa", 2),
        ("TA", 3),
        ("Gd", 4),
        ("Ex", 5),
    ])
    .with_absent(ABSENT_LABEL)
}

fn finish_type_scale() -> OrdinalScale {
    OrdinalScale::new(&[
        (ABSENT_LABEL, 0),
        ("Unf", 1),
        ("LwQ", 2),
        ("Rec", 3),
        ("BLQ", 4),
        ("ALQ", 5),
        ("GLQ", 6),
    ])
    .with_absent(ABSENT_LABEL)
}

/// Ordinal columns and their scales.
pub fn ordinal_scales() -> Vec<(&'static str, OrdinalScale)> {
    vec![
        (
            "BsmtQual",
            OrdinalScale::new(&[(ABSENT_LABEL, 0), ("Fa", 1), ("TA", 2), ("Gd", 3), ("Ex", 4)])
                .with_absent(ABSENT_LABEL),
        ),
        (
            "BsmtCond",
            OrdinalScale::new(&[(ABSENT_LABEL, 0), ("Po", 1), ("Fa", 2), ("TA", 3), ("Gd", 4)])
                .with_absent(ABSENT_LABEL),
        ),
        (
            "BsmtExposure",
            OrdinalScale::new(&[(ABSENT_LABEL, 0), ("No", 1), ("Mn", 2), ("Av", 3), ("Gd", 4)])
                .with_absent(ABSENT_LABEL),
        ),
        ("BsmtFinType1", finish_type_scale()),
        ("BsmtFinType2", finish_type_scale()),
        (
            "KitchenQual",
            OrdinalScale::new(&[("Fa", 1), ("TA", 2), ("Gd", 3), ("Ex", 4)]),
        ),
        (
            "Functional",
            OrdinalScale::new(&[
                ("Sev", 0),
                ("Maj2", 1),
                ("Maj1", 2),
                ("Mod", 3),
                ("Min2", 4),
                ("Min1", 5),
                ("Typ", 6),
            ]),
        ),
        ("FireplaceQu", absent_quality_scale()),
        (
            "GarageType",
            OrdinalScale::new(&[
                (ABSENT_LABEL, 0),
                ("Detchd", 1),
                ("CarPort", 2),
                ("BuiltIn", 3),
                ("Basment", 4),
                ("Attchd", 5),
                ("2Types", 6),
            ])
            .with_absent(ABSENT_LABEL),
        ),
        (
            "GarageFinish",
            OrdinalScale::new(&[(ABSENT_LABEL, 0), ("Unf", 1), ("RFn", 2), ("Fin", 3)])
                .with_absent(ABSENT_LABEL),
        ),
        ("GarageQual", absent_quality_scale()),
        ("GarageCond", absent_quality_scale()),
        ("PavedDrive", OrdinalScale::new(&[("N", 0), ("P", 1), ("Y", 2)])),
        (
            "PoolQC",
            OrdinalScale::new(&[(ABSENT_LABEL, 0), ("Fa", 1), ("TA", 2), ("Gd", 3), ("Ex", 4)])
                .with_absent(ABSENT_LABEL),
        ),
        (
            "Fence",
            OrdinalScale::new(&[
                (ABSENT_LABEL, 0),
                ("MnWw", 1),
                ("GdWo", 2),
                ("MnPrv", 3),
                ("GdPrv", 4),
            ])
            .with_absent(ABSENT_LABEL),
        ),
        (
            "MiscFeature",
            OrdinalScale::new(&[
                (ABSENT_LABEL, 0),
                ("Elev", 1),
                ("Gar2", 2),
                ("Othr", 3),
                ("Shed", 4),
                ("TenC", 5),
            ])
            .with_absent(ABSENT_LABEL),
        ),
        ("LandSlope", OrdinalScale::new(&[("Gtl", 1), ("Mod", 2), ("Sev", 3)])),
        ("ExterQual", quality_scale()),
        ("ExterCond", quality_scale()),
        ("HeatingQC", quality_scale()),
    ]
}

/// The built-in housing catalog.
pub fn housing_catalog() -> DirectiveCatalog {
    let mut catalog = DirectiveCatalog::new(CATALOG_NAME, CATALOG_VERSION)
        .drop_columns(DROPPED_COLUMNS)
        .directive(Directive::GroupMedianImpute {
            column: "LotFrontage".into(),
            group_by: None,
        });

    for column in ABSENT_FEATURE_COLUMNS {
        catalog = catalog.directive(Directive::ConstantImpute {
            column: column.into(),
            value: Sentinel::label(ABSENT_LABEL),
        });
    }
    catalog = catalog
        .directive(Directive::ConstantImpute {
            column: "GarageYrBlt".into(),
            value: Sentinel::Number(0.0),
        })
        .directive(Directive::ConstantImpute {
            column: "MasVnrType".into(),
            value: Sentinel::label("None"),
        })
        .directive(Directive::ConstantImpute {
            column: "MasVnrArea".into(),
            value: Sentinel::Number(0.0),
        })
        .directive(Directive::ModeImpute {
            column: "Electrical".into(),
        })
        .consistency_rule(ConsistencyRule {
            trigger_column: "MasVnrType".into(),
            trigger_label: "None".into(),
            target_column: "MasVnrArea".into(),
            forced_value: 0.0,
            trigger_fill: Some("None".into()),
        })
        .directive(Directive::LabelNormalize {
            column: "Exterior2nd".into(),
            mapping: lookup(&[
                ("Brk Cmn", "BrkComm"),
                ("CmentBd", "CemntBd"),
                ("Wd Shng", "WdShing"),
            ]),
        })
        .directive(Directive::RareCategoryGroup {
            column: "SaleType".into(),
            mapping: lookup(&[
                ("ConLD", "Con"),
                ("ConLI", "Con"),
                ("ConLw", "Con"),
                ("Con", "Con"),
                ("CWD", "Other"),
                ("Oth", "Other"),
            ]),
        })
        .directive(Directive::RareCategoryGroup {
            column: "SaleCondition".into(),
            mapping: lookup(&[
                ("Alloca", "Other"),
                ("AdjLand", "Other"),
                ("Family", "Other"),
            ]),
        });

    for column in NOMINAL_CODE_COLUMNS {
        catalog = catalog.directive(Directive::TypeReclassify {
            column: column.into(),
        });
    }
    for (column, scale) in ordinal_scales() {
        catalog = catalog.directive(Directive::OrdinalMap {
            column: column.into(),
            scale,
        });
    }
    for column in NOMINAL_COLUMNS {
        catalog = catalog.directive(Directive::OneHotExpand {
            column: column.into(),
        });
    }
    catalog
}
