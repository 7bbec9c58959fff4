//! Esquema Diesel de las tablas fijas. Las tablas de claims se nombran por
//! configuración y se consultan con `sql_query` (ver `pg`).

diesel::table! {
    claim_retention (namespace, kind) {
        namespace -> Text,
        kind -> Text,
        ttl_seconds -> BigInt,
        updated_at -> Timestamptz,
    }
}
