#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::{cast, take};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::*;
use housing_prep::settings::session_context;
use housing_prep::table::collect_batch;

pub fn utf8(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

pub fn f64s(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

pub fn i64s(values: &[i64]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

/// Builds a table from named columns. Every column is nullable.
pub fn table(columns: Vec<(&str, ArrayRef)>) -> DataFrame {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch =
        RecordBatch::try_new(schema, columns.into_iter().map(|(_, a)| a).collect()).unwrap();
    session_context().read_batch(batch).unwrap()
}

pub async fn collect(df: DataFrame) -> RecordBatch {
    collect_batch(df).await.unwrap()
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> ArrayRef {
    let index = batch
        .schema()
        .index_of(name)
        .unwrap_or_else(|_| panic!("column {} not found in {:?}", name, column_names(batch)));
    cast(batch.column(index), to).unwrap()
}

pub fn strings(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    let array = column_as(batch, name, &DataType::Utf8);
    let array = array.as_any().downcast_ref::<StringArray>().unwrap();
    array.iter().map(|v| v.map(str::to_string)).collect()
}

pub fn floats(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
    let array = column_as(batch, name, &DataType::Float64);
    let array = array.as_any().downcast_ref::<Float64Array>().unwrap();
    array.iter().collect()
}

pub fn ints(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    let array = column_as(batch, name, &DataType::Int64);
    let array = array.as_any().downcast_ref::<Int64Array>().unwrap();
    array.iter().collect()
}

pub fn data_type(batch: &RecordBatch, name: &str) -> DataType {
    batch
        .schema()
        .field_with_name(name)
        .unwrap()
        .data_type()
        .clone()
}

/// A six-row raw housing table with every column the housing catalog reads.
///
/// Rows 1, 2, 3 and 6 are in `Elm` (observed frontages 60, 80, 70; row 3 missing),
/// rows 4 and 5 in `Oak` (observed 50; row 5 missing). Row 3 has no basement or garage
/// and a missing masonry type; row 4 has masonry type `None` with a non-zero area.
pub struct HousingFixture {
    columns: Vec<(String, ArrayRef)>,
}

impl HousingFixture {
    pub fn new() -> Self {
        let columns: Vec<(&str, ArrayRef)> = vec![
            ("Id", i64s(&[1, 2, 3, 4, 5, 6])),
            ("MSSubClass", i64s(&[20, 60, 20, 50, 20, 60])),
            ("MSZoning", utf8(&[Some("RL"), Some("RL"), Some("RM"), Some("RL"), Some("RL"), Some("RM")])),
            ("LotFrontage", f64s(&[Some(60.0), Some(80.0), None, Some(50.0), None, Some(70.0)])),
            ("Street", utf8(&[Some("Pave"); 6])),
            ("Alley", utf8(&[None; 6])),
            ("LotShape", utf8(&[Some("Reg"), Some("IR1"), Some("Reg"), Some("Reg"), Some("IR1"), Some("Reg")])),
            ("LandContour", utf8(&[Some("Lvl"), Some("Lvl"), Some("Bnk"), Some("Lvl"), Some("HLS"), Some("Lvl")])),
            ("Utilities", utf8(&[Some("AllPub"); 6])),
            ("LotConfig", utf8(&[Some("Inside"), Some("Corner"), Some("Inside"), Some("FR2"), Some("Inside"), Some("Corner")])),
            ("LandSlope", utf8(&[Some("Gtl"), Some("Gtl"), Some("Mod"), Some("Gtl"), Some("Sev"), Some("Gtl")])),
            ("Neighborhood", utf8(&[Some("Elm"), Some("Elm"), Some("Elm"), Some("Oak"), Some("Oak"), Some("Elm")])),
            ("Condition1", utf8(&[Some("Norm"), Some("Feedr"), Some("Norm"), Some("Norm"), Some("Artery"), Some("Norm")])),
            ("Condition2", utf8(&[Some("Norm"); 6])),
            ("BldgType", utf8(&[Some("1Fam"), Some("1Fam"), Some("Duplex"), Some("1Fam"), Some("TwnhsE"), Some("1Fam")])),
            ("HouseStyle", utf8(&[Some("1Story"), Some("2Story"), Some("1Story"), Some("1.5Fin"), Some("1Story"), Some("2Story")])),
            ("OverallQual", i64s(&[5, 7, 6, 5, 4, 8])),
            ("RoofStyle", utf8(&[Some("Gable"), Some("Hip"), Some("Gable"), Some("Gable"), Some("Gable"), Some("Hip")])),
            ("RoofMatl", utf8(&[Some("CompShg"), Some("CompShg"), Some("CompShg"), Some("WdShngl"), Some("CompShg"), Some("CompShg")])),
            ("Exterior1st", utf8(&[Some("VinylSd"), Some("VinylSd"), Some("MetalSd"), Some("Wd Sdng"), Some("HdBoard"), Some("VinylSd")])),
            ("Exterior2nd", utf8(&[Some("VinylSd"), Some("Wd Shng"), Some("MetalSd"), Some("Brk Cmn"), Some("CmentBd"), Some("VinylSd")])),
            ("MasVnrType", utf8(&[Some("BrkFace"), Some("None"), None, Some("None"), Some("Stone"), Some("BrkFace")])),
            ("MasVnrArea", f64s(&[Some(196.0), Some(0.0), None, Some(40.0), Some(120.0), None])),
            ("ExterQual", utf8(&[Some("Gd"), Some("TA"), Some("TA"), Some("Fa"), Some("TA"), Some("Ex")])),
            ("ExterCond", utf8(&[Some("TA"), Some("TA"), Some("Gd"), Some("TA"), Some("Po"), Some("TA")])),
            ("Foundation", utf8(&[Some("PConc"), Some("PConc"), Some("CBlock"), Some("BrkTil"), Some("CBlock"), Some("PConc")])),
            ("BsmtQual", utf8(&[Some("Gd"), Some("Gd"), None, Some("TA"), Some("Fa"), Some("Ex")])),
            ("BsmtCond", utf8(&[Some("TA"), Some("TA"), None, Some("TA"), Some("Po"), Some("Gd")])),
            ("BsmtExposure", utf8(&[Some("No"), Some("Gd"), None, Some("Mn"), Some("Av"), Some("No")])),
            ("BsmtFinType1", utf8(&[Some("GLQ"), Some("ALQ"), None, Some("Unf"), Some("Rec"), Some("BLQ")])),
            ("BsmtFinType2", utf8(&[Some("Unf"), Some("Unf"), None, Some("LwQ"), Some("Unf"), Some("Unf")])),
            ("Heating", utf8(&[Some("GasA"), Some("GasA"), Some("GasA"), Some("GasW"), Some("GasA"), Some("GasA")])),
            ("HeatingQC", utf8(&[Some("Ex"), Some("Ex"), Some("TA"), Some("Gd"), Some("Fa"), Some("Ex")])),
            ("CentralAir", utf8(&[Some("Y"), Some("Y"), Some("Y"), Some("N"), Some("Y"), Some("Y")])),
            ("Electrical", utf8(&[Some("SBrkr"), Some("SBrkr"), None, Some("FuseA"), Some("SBrkr"), Some("SBrkr")])),
            ("1stFlrSF", i64s(&[856, 920, 961, 756, 1145, 796])),
            ("KitchenQual", utf8(&[Some("Gd"), Some("TA"), Some("Gd"), Some("Fa"), Some("TA"), Some("Ex")])),
            ("Functional", utf8(&[Some("Typ"), Some("Typ"), Some("Min1"), Some("Typ"), Some("Maj1"), Some("Typ")])),
            ("FireplaceQu", utf8(&[None, Some("TA"), Some("Gd"), None, Some("Po"), Some("Ex")])),
            ("GarageType", utf8(&[Some("Attchd"), Some("Attchd"), None, Some("Detchd"), Some("BuiltIn"), Some("Attchd")])),
            ("GarageYrBlt", f64s(&[Some(2003.0), Some(1976.0), None, Some(1998.0), Some(2000.0), Some(2003.0)])),
            ("GarageFinish", utf8(&[Some("RFn"), Some("RFn"), None, Some("Unf"), Some("Fin"), Some("RFn")])),
            ("GarageQual", utf8(&[Some("TA"), Some("TA"), None, Some("Fa"), Some("TA"), Some("Gd")])),
            ("GarageCond", utf8(&[Some("TA"), Some("TA"), None, Some("TA"), Some("Po"), Some("TA")])),
            ("PavedDrive", utf8(&[Some("Y"), Some("Y"), Some("N"), Some("Y"), Some("P"), Some("Y")])),
            ("PoolQC", utf8(&[None, None, None, None, Some("Gd"), None])),
            ("Fence", utf8(&[None, Some("MnPrv"), None, Some("GdWo"), None, None])),
            ("MiscFeature", utf8(&[None, None, Some("Shed"), None, None, None])),
            ("MoSold", i64s(&[2, 5, 9, 2, 12, 8])),
            ("YrSold", i64s(&[2008, 2007, 2008, 2006, 2008, 2007])),
            ("SaleType", utf8(&[Some("WD"), Some("WD"), Some("ConLI"), Some("New"), Some("COD"), Some("CWD")])),
            ("SaleCondition", utf8(&[Some("Normal"), Some("Normal"), Some("Abnorml"), Some("Family"), Some("Normal"), Some("Partial")])),
            ("SalePrice", i64s(&[208500, 181500, 223500, 140000, 250000, 143000])),
        ];
        Self {
            columns: columns
                .into_iter()
                .map(|(name, array)| (name.to_string(), array))
                .collect(),
        }
    }

    /// Replaces a column, or appends it when absent.
    pub fn with(mut self, name: &str, array: ArrayRef) -> Self {
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = array,
            None => self.columns.push((name.to_string(), array)),
        }
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.columns.retain(|(n, _)| n != name);
        self
    }

    /// Keeps the given rows, in the given order (rows may repeat).
    pub fn rows(mut self, indices: &[u32]) -> Self {
        let indices = UInt32Array::from(indices.to_vec());
        for (_, array) in self.columns.iter_mut() {
            *array = take(array.as_ref(), &indices, None).unwrap();
        }
        self
    }

    pub fn build(&self) -> DataFrame {
        table(
            self.columns
                .iter()
                .map(|(name, array)| (name.as_str(), array.clone()))
                .collect(),
        )
    }
}
