pub const FIELDS_TABLE_NAME: &str = "Fields";
pub const PATH: &str = "path";
pub const VALUE: &str = "value";

pub const SIKAPS_TABLE_NAME: &str = "Sikaps";
pub const RECORD_ID: &str = "record_id";
pub const PARENT: &str = "parent";
pub const DATE: &str = "date";
pub const DISTANCE: &str = "distance";
pub const CREATED_AT: &str = "created_at";
