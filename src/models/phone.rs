#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Phone {
    pub phone_id: i32,
    pub client_id: i32,
    pub phone_number: String,
}
