// Diesel table definitions for the bookdex database.
// Kept in sync with repository/migrations.rs.

diesel::table! {
    categories (id) {
        id -> Integer,
        name -> Text,
        slug -> Text,
        description -> Nullable<Text>,
        source_url -> Nullable<Text>,
        is_active -> Integer,
        display_order -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    products (id) {
        id -> Integer,
        title -> Text,
        author -> Nullable<Text>,
        price -> Nullable<Double>,
        currency -> Nullable<Text>,
        image_url -> Nullable<Text>,
        description -> Nullable<Text>,
        isbn -> Nullable<Text>,
        isbn13 -> Nullable<Text>,
        publisher -> Nullable<Text>,
        pages -> Nullable<Integer>,
        language -> Nullable<Text>,
        dimensions -> Nullable<Text>,
        condition -> Nullable<Text>,
        format -> Nullable<Text>,
        rating -> Nullable<Double>,
        review_count -> Integer,
        source_url -> Nullable<Text>,
        similar_products -> Text,
        is_available -> Integer,
        category_id -> Integer,
        created_at -> Text,
        updated_at -> Text,
        last_scraped_at -> Nullable<Text>,
    }
}

diesel::table! {
    product_reviews (id) {
        id -> Integer,
        product_id -> Integer,
        reviewer_name -> Nullable<Text>,
        rating -> Integer,
        review_title -> Nullable<Text>,
        review_text -> Nullable<Text>,
        is_verified_purchase -> Integer,
        review_date -> Nullable<Text>,
        helpful_count -> Nullable<Integer>,
        created_at -> Text,
    }
}

diesel::joinable!(products -> categories (category_id));
diesel::joinable!(product_reviews -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(categories, products, product_reviews);
