/// Foreign-key behaviour of `phone.client_id` when a client row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnClientDelete {
    #[default]
    Restrict,
    Cascade,
}

pub(crate) const DROP_PHONE: &str = "DROP TABLE IF EXISTS phone";
pub(crate) const DROP_CLIENT: &str = "DROP TABLE IF EXISTS client";

pub(crate) const CREATE_CLIENT: &str = r#"
    CREATE TABLE client (
        client_id serial PRIMARY KEY,
        first_name varchar(40) NOT NULL,
        last_name varchar(40) NOT NULL,
        email varchar(60) UNIQUE
    )
"#;

const CREATE_PHONE: &str = r#"
    CREATE TABLE phone (
        phone_id serial PRIMARY KEY,
        client_id int NOT NULL REFERENCES client(client_id),
        phone_number varchar(11) UNIQUE
    )
"#;

const CREATE_PHONE_CASCADE: &str = r#"
    CREATE TABLE phone (
        phone_id serial PRIMARY KEY,
        client_id int NOT NULL REFERENCES client(client_id) ON DELETE CASCADE,
        phone_number varchar(11) UNIQUE
    )
"#;

pub(crate) fn create_phone(on_delete: OnClientDelete) -> &'static str {
    match on_delete {
        OnClientDelete::Restrict => CREATE_PHONE,
        OnClientDelete::Cascade => CREATE_PHONE_CASCADE,
    }
}
