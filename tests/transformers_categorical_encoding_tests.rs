mod common;

use std::collections::BTreeMap;

use arrow::datatypes::DataType;
use common::{collect, column_names, data_type, i64s, ints, table, utf8};
use housing_prep::catalog::OrdinalScale;
use housing_prep::exceptions::{PrepError, PrepResult};
use housing_prep::settings::ReferencePolicy;
use housing_prep::transformers::categorical_encoding::{OneHotEncoder, OrdinalEncoder};

fn bsmt_qual_scale() -> OrdinalScale {
    OrdinalScale::new(&[("NA", 0), ("Fa", 1), ("TA", 2), ("Gd", 3), ("Ex", 4)]).with_absent("NA")
}

fn ordinal(column: &str, scale: OrdinalScale) -> OrdinalEncoder {
    OrdinalEncoder::new(BTreeMap::from([(column.to_string(), scale)]))
}

fn one_hot(columns: &[&str], policy: ReferencePolicy) -> OneHotEncoder {
    OneHotEncoder::new(columns.iter().map(|c| c.to_string()).collect(), policy)
}

#[tokio::test]
async fn test_ordinal_labels_become_ranks() -> PrepResult<()> {
    let df = table(vec![(
        "BsmtQual",
        utf8(&[Some("Gd"), Some("NA"), Some("Ex"), Some("TA"), Some("Fa")]),
    )]);

    let mut encoder = ordinal("BsmtQual", bsmt_qual_scale());
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;

    assert_eq!(data_type(&batch, "BsmtQual"), DataType::Int64);
    assert_eq!(
        ints(&batch, "BsmtQual"),
        vec![Some(3), Some(0), Some(4), Some(2), Some(1)]
    );
    Ok(())
}

#[tokio::test]
async fn test_unmapped_ordinal_label_is_an_error() {
    let df = table(vec![(
        "BsmtQual",
        utf8(&[Some("Gd"), Some("Po"), Some("Excellent")]),
    )]);

    let mut encoder = ordinal("BsmtQual", bsmt_qual_scale());
    let err = encoder.fit(&df).await.unwrap_err();
    match err {
        PrepError::UnmappedCategory { column, label } => {
            assert_eq!(column, "BsmtQual");
            // The first offending label in sorted order.
            assert_eq!(label, "Excellent");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_ordinal_value_is_an_error() {
    let df = table(vec![("BsmtQual", utf8(&[Some("Gd"), None]))]);

    let mut encoder = ordinal("BsmtQual", bsmt_qual_scale());
    let err = encoder.fit(&df).await.unwrap_err();
    assert!(matches!(
        err,
        PrepError::IncompleteColumn { ref column, nulls: 1 } if column == "BsmtQual"
    ));
}

#[tokio::test]
async fn test_encoded_ordinal_column_passes_through() -> PrepResult<()> {
    let df = table(vec![("BsmtQual", i64s(&[3, 0, 4]))]);

    let mut encoder = ordinal("BsmtQual", bsmt_qual_scale());
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;
    assert_eq!(ints(&batch, "BsmtQual"), vec![Some(3), Some(0), Some(4)]);
    Ok(())
}

#[tokio::test]
async fn test_several_ordinal_columns() -> PrepResult<()> {
    let df = table(vec![
        ("BsmtQual", utf8(&[Some("Gd"), Some("NA")])),
        ("PavedDrive", utf8(&[Some("Y"), Some("P")])),
    ]);

    let mut encoder = OrdinalEncoder::new(BTreeMap::from([
        ("BsmtQual".to_string(), bsmt_qual_scale()),
        (
            "PavedDrive".to_string(),
            OrdinalScale::new(&[("N", 0), ("P", 1), ("Y", 2)]),
        ),
    ]));
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;
    assert_eq!(ints(&batch, "BsmtQual"), vec![Some(3), Some(0)]);
    assert_eq!(ints(&batch, "PavedDrive"), vec![Some(2), Some(1)]);
    Ok(())
}

#[tokio::test]
async fn test_one_hot_drops_first_label() -> PrepResult<()> {
    let df = table(vec![
        ("LotArea", i64s(&[8450, 9600, 11250, 9550])),
        (
            "SaleType",
            utf8(&[Some("WD"), Some("New"), Some("Con"), Some("WD")]),
        ),
        ("SalePrice", i64s(&[208500, 181500, 223500, 140000])),
    ]);

    let mut encoder = one_hot(&["SaleType"], ReferencePolicy::DropFirst);
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;

    // Indicators replace the original column in place, alphabetically, without "Con".
    assert_eq!(
        column_names(&batch),
        vec!["LotArea", "SaleType_New", "SaleType_WD", "SalePrice"]
    );
    assert_eq!(data_type(&batch, "SaleType_New"), DataType::Int32);
    assert_eq!(
        ints(&batch, "SaleType_New"),
        vec![Some(0), Some(1), Some(0), Some(0)]
    );
    assert_eq!(
        ints(&batch, "SaleType_WD"),
        vec![Some(1), Some(0), Some(0), Some(1)]
    );
    Ok(())
}

#[tokio::test]
async fn test_one_hot_row_sums_are_zero_or_one() -> PrepResult<()> {
    let df = table(vec![(
        "Foundation",
        utf8(&[Some("PConc"), Some("CBlock"), Some("BrkTil"), Some("Slab"), Some("PConc")]),
    )]);

    let mut encoder = one_hot(&["Foundation"], ReferencePolicy::DropFirst);
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;

    let names = column_names(&batch);
    assert_eq!(names.len(), 3);
    for row in 0..batch.num_rows() {
        let sum: i64 = names
            .iter()
            .map(|name| ints(&batch, name)[row].unwrap())
            .sum();
        assert!(sum == 0 || sum == 1, "row {} sums to {}", row, sum);
    }
    // The reference category "BrkTil" is the all-zero row.
    let reference_row: i64 = names.iter().map(|name| ints(&batch, name)[2].unwrap()).sum();
    assert_eq!(reference_row, 0);
    Ok(())
}

#[tokio::test]
async fn test_one_hot_keep_all() -> PrepResult<()> {
    let df = table(vec![("CentralAir", utf8(&[Some("Y"), Some("N"), Some("Y")]))]);

    let mut encoder = one_hot(&["CentralAir"], ReferencePolicy::KeepAll);
    encoder.fit(&df).await?;
    let batch = collect(encoder.transform(df)?).await;
    assert_eq!(column_names(&batch), vec!["CentralAir_N", "CentralAir_Y"]);
    Ok(())
}

#[tokio::test]
async fn test_one_hot_numeric_labels() -> PrepResult<()> {
    let df = table(vec![
        ("MoSold", utf8(&[Some("2"), Some("12"), Some("5")])),
        ("SalePrice", i64s(&[1, 2, 3])),
    ]);

    let mut encoder = one_hot(&["MoSold"], ReferencePolicy::DropFirst);
    encoder.fit(&df).await?;
    assert_eq!(encoder.categories["MoSold"], vec!["2", "5"]);
    let batch = collect(encoder.transform(df)?).await;
    assert_eq!(
        column_names(&batch),
        vec!["MoSold_2", "MoSold_5", "SalePrice"]
    );
    Ok(())
}

#[tokio::test]
async fn test_one_hot_missing_value_is_an_error() {
    let df = table(vec![("Electrical", utf8(&[Some("SBrkr"), None]))]);

    let mut encoder = one_hot(&["Electrical"], ReferencePolicy::DropFirst);
    let err = encoder.fit(&df).await.unwrap_err();
    assert!(matches!(err, PrepError::IncompleteColumn { .. }));
}

#[tokio::test]
async fn test_one_hot_name_collision_is_rejected() {
    let df = table(vec![
        ("Heating", utf8(&[Some("GasA"), Some("GasW")])),
        ("Heating_GasW", i64s(&[0, 1])),
    ]);

    let mut encoder = one_hot(&["Heating"], ReferencePolicy::DropFirst);
    let err = encoder.fit(&df).await.unwrap_err();
    assert!(matches!(err, PrepError::InvalidParameter(_)));
}

#[tokio::test]
async fn test_one_hot_expanded_column_is_skipped() -> PrepResult<()> {
    let df = table(vec![
        ("SaleType_New", i64s(&[0, 1])),
        ("SaleType_WD", i64s(&[1, 0])),
    ]);

    let mut encoder = one_hot(&["SaleType"], ReferencePolicy::DropFirst);
    encoder.fit(&df).await?;
    assert!(encoder.categories.is_empty());
    let batch = collect(encoder.transform(df)?).await;
    assert_eq!(column_names(&batch), vec!["SaleType_New", "SaleType_WD"]);
    Ok(())
}

#[tokio::test]
async fn test_one_hot_missing_column_is_rejected() {
    let df = table(vec![("SalePrice", i64s(&[1]))]);

    let mut encoder = one_hot(&["SaleType"], ReferencePolicy::DropFirst);
    let err = encoder.fit(&df).await.unwrap_err();
    assert!(matches!(err, PrepError::MissingColumns(_)));
}
