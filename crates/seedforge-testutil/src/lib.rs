use seedforge_core::schema::types::*;

fn column(name: &str, sql_type: SqlType, nullable: bool) -> Column {
    let mut c = Column::new(name, sql_type);
    c.nullable = nullable;
    c
}

fn serial(name: &str) -> Column {
    let mut c = column(name, SqlType::Integer, false);
    c.auto_increment = true;
    c
}

fn varchar(name: &str, length: u32, nullable: bool) -> Column {
    column(name, SqlType::VarChar { length: Some(length) }, nullable)
}

/// A small store: customers, products, orders and order items.
///
/// Exercises CHECK inference (ranges, IN lists, length limits), a UUID
/// column, fixed-length text, decimals, a composite primary key and a
/// 1:1 relation (customer_profiles.customer_id is the table's key).
pub fn store_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(Dialect::Postgres, "store".to_string());

    let mut customers = Table::new("customers");
    customers.columns.push(serial("id"));
    customers.columns.push(column("public_id", SqlType::Uuid, false));
    customers.columns.push(varchar("email", 120, false));
    customers.columns.push(varchar("name", 40, true));
    customers.columns.push(column("country", SqlType::Char { length: Some(2) }, false));
    customers.columns.push(column("age", SqlType::SmallInt, true));
    customers.columns.push(column("created_at", SqlType::TimestampTz, false));
    customers.columns.push(column("deleted_at", SqlType::Timestamp, true));
    customers.primary_key = vec!["id".to_string()];
    customers.unique_keys.push(vec!["email".to_string()]);
    customers.check_constraints = vec![
        "((age >= 18) AND (age <= 120))".to_string(),
        "(country IN ('US', 'DE', 'FR', 'JP'))".to_string(),
    ];

    let mut profiles = Table::new("customer_profiles");
    profiles.columns.push(column("customer_id", SqlType::Integer, false));
    profiles.columns.push(column("bio", SqlType::Text, true));
    profiles.primary_key = vec!["customer_id".to_string()];
    profiles
        .foreign_keys
        .push(ForeignKey::new("customers", [("customer_id", "id")]));

    let mut products = Table::new("products");
    products.columns.push(serial("id"));
    products.columns.push(varchar("sku", 12, false));
    products.columns.push(column(
        "price",
        SqlType::Decimal {
            precision: Some(8),
            scale: Some(2),
        },
        false,
    ));
    products.columns.push(column("stock", SqlType::Integer, false));
    products.columns.push(varchar("status", 16, false));
    products.columns.push(column("metadata", SqlType::Json, true));
    products.primary_key = vec!["id".to_string()];
    products.unique_keys.push(vec!["sku".to_string()]);
    products.check_constraints = vec![
        "(price > 0)".to_string(),
        "((stock >= 0) AND (stock <= 500))".to_string(),
        "((status)::text = ANY ((ARRAY['draft'::character varying, 'active'::character varying, 'retired'::character varying])::text[]))".to_string(),
        "(char_length((sku)::text) >= 4)".to_string(),
    ];

    let mut orders = Table::new("orders");
    orders.columns.push(serial("id"));
    orders.columns.push(column("customer_id", SqlType::Integer, false));
    orders.columns.push(column("placed_on", SqlType::Date, false));
    orders.columns.push(varchar("notes", 200, true));
    orders.primary_key = vec!["id".to_string()];
    orders
        .foreign_keys
        .push(ForeignKey::new("customers", [("customer_id", "id")]));

    let mut items = Table::new("order_items");
    items.columns.push(column("order_id", SqlType::Integer, false));
    items.columns.push(column("line_no", SqlType::SmallInt, false));
    items.columns.push(column("product_id", SqlType::Integer, false));
    items.columns.push(column("quantity", SqlType::Integer, false));
    items.primary_key = vec!["order_id".to_string(), "line_no".to_string()];
    items
        .foreign_keys
        .push(ForeignKey::new("orders", [("order_id", "id")]));
    items
        .foreign_keys
        .push(ForeignKey::new("products", [("product_id", "id")]));
    items.check_constraints = vec!["(quantity BETWEEN 1 AND 10)".to_string()];

    // Catalog order deliberately lists children before parents.
    schema.add_table(items);
    schema.add_table(orders);
    schema.add_table(profiles);
    schema.add_table(products);
    schema.add_table(customers);
    schema.normalize();
    schema
}

/// Departments and employees referencing each other.
///
/// `departments.head_id` is nullable, `employees.department_id` is not, so
/// the cycle can be broken without deferred constraints.
pub fn cyclic_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(Dialect::Postgres, "hr".to_string());

    let mut departments = Table::new("departments");
    departments.columns.push(serial("id"));
    departments.columns.push(varchar("name", 60, false));
    departments.columns.push(column("head_id", SqlType::Integer, true));
    departments.primary_key = vec!["id".to_string()];
    departments
        .foreign_keys
        .push(ForeignKey::new("employees", [("head_id", "id")]));

    let mut employees = Table::new("employees");
    employees.columns.push(serial("id"));
    employees.columns.push(varchar("name", 60, false));
    employees.columns.push(column("department_id", SqlType::Integer, false));
    employees.primary_key = vec!["id".to_string()];
    employees
        .foreign_keys
        .push(ForeignKey::new("departments", [("department_id", "id")]));

    schema.add_table(departments);
    schema.add_table(employees);
    schema.normalize();
    schema
}

/// Employees with a nullable `manager_id` pointing back into the table.
pub fn self_referencing_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(Dialect::Postgres, "org".to_string());

    let mut employees = Table::new("employees");
    employees.columns.push(serial("id"));
    employees.columns.push(varchar("name", 60, false));
    employees.columns.push(column("manager_id", SqlType::Integer, true));
    employees.primary_key = vec!["id".to_string()];
    employees
        .foreign_keys
        .push(ForeignKey::new("employees", [("manager_id", "id")]));

    schema.add_table(employees);
    schema.normalize();
    schema
}

/// Two tables referencing each other through NOT NULL columns. Only
/// insertable with deferred constraints.
pub fn not_null_cycle_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(Dialect::Postgres, "locked".to_string());

    let mut a = Table::new("a");
    a.columns.push(serial("id"));
    a.columns.push(column("b_id", SqlType::Integer, false));
    a.primary_key = vec!["id".to_string()];
    let mut fk = ForeignKey::new("b", [("b_id", "id")]);
    fk.deferrable = true;
    a.foreign_keys.push(fk);

    let mut b = Table::new("b");
    b.columns.push(serial("id"));
    b.columns.push(column("a_id", SqlType::Integer, false));
    b.primary_key = vec!["id".to_string()];
    let mut fk = ForeignKey::new("a", [("a_id", "id")]);
    fk.deferrable = true;
    b.foreign_keys.push(fk);

    schema.add_table(a);
    schema.add_table(b);
    schema.normalize();
    schema
}

/// Posts, tags and two tables keyed on foreign key columns.
///
/// `post_tags` is a join table whose primary key is both foreign keys.
/// `reviews` has `UNIQUE (post_id, kind)` mixing a foreign key with a
/// generated column limited to two values.
pub fn tagging_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(Dialect::Postgres, "blog".to_string());

    let mut posts = Table::new("posts");
    posts.columns.push(serial("id"));
    posts.columns.push(varchar("title", 80, false));
    posts.primary_key = vec!["id".to_string()];

    let mut tags = Table::new("tags");
    tags.columns.push(serial("id"));
    tags.columns.push(varchar("label", 30, false));
    tags.primary_key = vec!["id".to_string()];
    tags.unique_keys.push(vec!["label".to_string()]);

    let mut post_tags = Table::new("post_tags");
    post_tags.columns.push(column("post_id", SqlType::Integer, false));
    post_tags.columns.push(column("tag_id", SqlType::Integer, false));
    post_tags.primary_key = vec!["post_id".to_string(), "tag_id".to_string()];
    post_tags
        .foreign_keys
        .push(ForeignKey::new("posts", [("post_id", "id")]));
    post_tags
        .foreign_keys
        .push(ForeignKey::new("tags", [("tag_id", "id")]));

    let mut reviews = Table::new("reviews");
    reviews.columns.push(serial("id"));
    reviews.columns.push(column("post_id", SqlType::Integer, false));
    reviews.columns.push(varchar("kind", 10, false));
    reviews.primary_key = vec!["id".to_string()];
    reviews
        .unique_keys
        .push(vec!["post_id".to_string(), "kind".to_string()]);
    reviews
        .foreign_keys
        .push(ForeignKey::new("posts", [("post_id", "id")]));
    reviews.check_constraints = vec!["(kind IN ('draft', 'final'))".to_string()];

    schema.add_table(post_tags);
    schema.add_table(reviews);
    schema.add_table(posts);
    schema.add_table(tags);
    schema.normalize();
    schema
}
