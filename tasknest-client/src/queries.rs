/// SQL for the device key-value store.
pub struct Queries;

impl Queries {
    pub const GET_ITEM: &'static str = "SELECT value FROM kv_store WHERE key = ?1";

    pub const SET_ITEM: &'static str = r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
    "#;

    pub const REMOVE_ITEM: &'static str = "DELETE FROM kv_store WHERE key = ?1";

    pub const COUNT_ITEMS: &'static str = "SELECT COUNT(*) FROM kv_store";
}
