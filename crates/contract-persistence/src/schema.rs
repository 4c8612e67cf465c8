// Esquema Diesel para SQLite.
// Tablas: blueprints, contracts, status_history
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    blueprints (id) {
        id -> Text,
        name -> Text,
        owner_id -> Text,
        fields -> Text,
        schema_hash -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    contracts (id) {
        id -> Text,
        name -> Text,
        blueprint_id -> Nullable<Text>,
        owner_id -> Text,
        status -> Text,
        fields -> Text,
        schema_hash -> Text,
        version -> BigInt,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    status_history (id) {
        id -> Text,
        contract_id -> Text,
        seq -> BigInt,
        from_status -> Text,
        to_status -> Text,
        actor_id -> Text,
        at_ts -> BigInt,
    }
}
diesel::joinable!(status_history -> contracts (contract_id));
allow_tables_to_appear_in_same_query!(blueprints, contracts, status_history);
