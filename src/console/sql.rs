// Editor helpers: a light SQL layout pass, starter statements and the
// restaurant schema
use crate::models::DatabaseType;

/// Starter statements offered by the editor, keyed by a short name
pub const SQL_TEMPLATES: &[(&str, &str)] = &[
    ("selectAll", "SELECT * FROM table_name"),
    ("selectWhere", "SELECT * FROM table_name WHERE condition"),
    ("insert", "INSERT INTO table_name (columns) VALUES (values)"),
    ("update", "UPDATE table_name SET column = value WHERE condition"),
    ("delete", "DELETE FROM table_name WHERE condition"),
    ("countAll", "SELECT COUNT(*) FROM table_name"),
    (
        "createTable",
        "CREATE TABLE table_name (\n  column1 INT PRIMARY KEY,\n  column2 VARCHAR(100) NOT NULL,\n  column3 TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n)",
    ),
    (
        "createView",
        "CREATE VIEW view_name AS SELECT * FROM table_name WHERE condition",
    ),
    (
        "joinTables",
        "SELECT a.column1, b.column2\nFROM table1 a\nJOIN table2 b ON a.id = b.foreign_key",
    ),
    ("listRestaurants", "SELECT * FROM Restaurante"),
    (
        "listEmployees",
        "SELECT e.Cedula, e.Nombres, e.Numero_Contacto, e.Correo_Corporativo,\n  a.Nombre_Area AS Area, c.Nombre_Cargo AS Cargo, s.Nombre_Sede AS Sede\nFROM Empleado e\nJOIN Area a ON e.ID_Area = a.ID_Area\nJOIN Cargo c ON e.ID_Cargo = c.ID_Cargo\nJOIN Sede s ON e.ID_Sede = s.ID_Sede\nORDER BY e.Nombres",
    ),
    (
        "listInventory",
        "SELECT mp.Nombre_Ingrediente, mp.Cantidad_Stock, mp.Unidad_Medida, mp.Fecha_Caducidad, mp.Descripcion\nFROM Materias_Primas mp\nJOIN Inventario_Materias_Primas inv ON mp.ID_Inventario_MP = inv.ID_Inventario_MP\nORDER BY mp.Fecha_Caducidad ASC",
    ),
    (
        "lowStock",
        "SELECT mp.Nombre_Ingrediente, mp.Cantidad_Stock, mp.Unidad_Medida\nFROM Materias_Primas mp\nWHERE mp.Cantidad_Stock < 10\nORDER BY mp.Cantidad_Stock",
    ),
    (
        "listOrders",
        "SELECT o.ID_Orden, o.Fecha_Hora, m.Numero_Mesa, e.Nombres AS Empleado,\n  SUM(p.Precio * d.Cantidad) AS Total\nFROM Orden o\nJOIN Mesa m ON o.ID_Mesa = m.ID_Mesa\nJOIN Empleado e ON o.ID_Empleado = e.Cedula\nJOIN Detalle_Orden d ON o.ID_Orden = d.ID_Orden\nJOIN Plato p ON d.ID_Plato = p.ID_Plato\nGROUP BY o.ID_Orden, o.Fecha_Hora, m.Numero_Mesa, e.Nombres\nORDER BY o.Fecha_Hora DESC",
    ),
    (
        "revenueByMonth",
        "SELECT EXTRACT(YEAR FROM f.Fecha_Emision) AS Anio,\n  EXTRACT(MONTH FROM f.Fecha_Emision) AS Mes,\n  SUM(f.Total) AS Ingresos_Totales,\n  COUNT(f.ID_Factura) AS Cantidad_Facturas\nFROM Factura f\nGROUP BY EXTRACT(YEAR FROM f.Fecha_Emision), EXTRACT(MONTH FROM f.Fecha_Emision)\nORDER BY Anio DESC, Mes DESC",
    ),
    (
        "listDishes",
        "SELECT p.ID_Plato AS id, p.Nombre_Plato AS name, p.Descripcion AS description, p.Precio AS price\nFROM Plato p\nORDER BY p.Nombre_Plato",
    ),
];

pub fn template(name: &str) -> Option<&'static str> {
    SQL_TEMPLATES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, sql)| *sql)
}

/// Ingredients of one dish with the quantity each portion uses
pub fn dish_ingredients(dish_id: i64) -> String {
    format!(
        "SELECT mp.ID_Ingrediente AS id, mp.Nombre_Ingrediente AS name, pi.Cantidad_Usada AS quantity, mp.Unidad_Medida AS unit\n\
         FROM Plato_Ingrediente pi\n\
         JOIN Materias_Primas mp ON pi.ID_Ingrediente = mp.ID_Ingrediente\n\
         WHERE pi.ID_Plato = {}",
        dish_id
    )
}

/// Restaurant tables in dependency order. `{id}` marks the surrogate key and
/// `{datetime}` a timestamp column; both differ between engines.
const RESTAURANT_TABLES: &[(&str, &str)] = &[
    ("Restaurante", "RUT VARCHAR(20) PRIMARY KEY,\n  Nombre VARCHAR(100) NOT NULL"),
    ("Sede", "ID_Sede {id},\n  Nombre_Sede VARCHAR(50) NOT NULL,\n  Direccion VARCHAR(255)"),
    ("Area", "ID_Area {id},\n  Nombre_Area VARCHAR(50) NOT NULL"),
    (
        "Cargo",
        "ID_Cargo {id},\n  Nombre_Cargo VARCHAR(50) NOT NULL,\n  Salario_Base DECIMAL(12, 2) NOT NULL",
    ),
    (
        "Empleado",
        "Cedula VARCHAR(20) PRIMARY KEY,\n  RUT VARCHAR(20) NOT NULL,\n  ID_Sede INT NOT NULL,\n  ID_Cargo INT NOT NULL,\n  ID_Area INT NOT NULL,\n  Nombres VARCHAR(100) NOT NULL,\n  Numero_Contacto VARCHAR(20),\n  Correo_Corporativo VARCHAR(100),\n  FOREIGN KEY (RUT) REFERENCES Restaurante(RUT),\n  FOREIGN KEY (ID_Sede) REFERENCES Sede(ID_Sede),\n  FOREIGN KEY (ID_Cargo) REFERENCES Cargo(ID_Cargo),\n  FOREIGN KEY (ID_Area) REFERENCES Area(ID_Area)",
    ),
    (
        "Horario",
        "ID_Horario {id},\n  ID_Empleado VARCHAR(20) NOT NULL,\n  Dia_Semana VARCHAR(15),\n  Hora_Inicio TIME,\n  Hora_Fin TIME,\n  FOREIGN KEY (ID_Empleado) REFERENCES Empleado(Cedula)",
    ),
    (
        "Nomina",
        "ID_Nomina {id},\n  Cedula VARCHAR(20) NOT NULL,\n  Fecha_Pago DATE NOT NULL,\n  Horas_Trabajadas DECIMAL(5, 2),\n  Bonificaciones DECIMAL(12, 2),\n  FOREIGN KEY (Cedula) REFERENCES Empleado(Cedula)",
    ),
    (
        "Inventario_Materias_Primas",
        "ID_Inventario_MP {id},\n  RUT VARCHAR(20) NOT NULL,\n  FOREIGN KEY (RUT) REFERENCES Restaurante(RUT)",
    ),
    (
        "Materias_Primas",
        "ID_Ingrediente {id},\n  ID_Inventario_MP INT NOT NULL,\n  Nombre_Ingrediente VARCHAR(100) NOT NULL,\n  Descripcion TEXT,\n  Fecha_Caducidad DATE,\n  Cantidad_Stock DECIMAL(10, 3),\n  Unidad_Medida VARCHAR(20),\n  FOREIGN KEY (ID_Inventario_MP) REFERENCES Inventario_Materias_Primas(ID_Inventario_MP)",
    ),
    (
        "Espacio",
        "ID_Espacio {id},\n  ID_Sede INT NOT NULL,\n  Capacidad_Maxima INT,\n  FOREIGN KEY (ID_Sede) REFERENCES Sede(ID_Sede)",
    ),
    (
        "Mesa",
        "ID_Mesa {id},\n  ID_Espacio INT NOT NULL,\n  Numero_Mesa INT,\n  FOREIGN KEY (ID_Espacio) REFERENCES Espacio(ID_Espacio)",
    ),
    (
        "Plato",
        "ID_Plato {id},\n  Nombre_Plato VARCHAR(100) NOT NULL,\n  Descripcion TEXT,\n  Precio DECIMAL(12, 2) NOT NULL",
    ),
    (
        "Plato_Ingrediente",
        "ID_Plato_Ingrediente {id},\n  ID_Plato INT NOT NULL,\n  ID_Ingrediente INT NOT NULL,\n  Cantidad_Usada DECIMAL(10, 3),\n  FOREIGN KEY (ID_Plato) REFERENCES Plato(ID_Plato),\n  FOREIGN KEY (ID_Ingrediente) REFERENCES Materias_Primas(ID_Ingrediente)",
    ),
    (
        "Orden",
        "ID_Orden {id},\n  ID_Mesa INT NOT NULL,\n  ID_Empleado VARCHAR(20) NOT NULL,\n  Fecha_Hora {datetime} NOT NULL,\n  FOREIGN KEY (ID_Mesa) REFERENCES Mesa(ID_Mesa),\n  FOREIGN KEY (ID_Empleado) REFERENCES Empleado(Cedula)",
    ),
    (
        "Detalle_Orden",
        "ID_Detalle_Orden {id},\n  ID_Orden INT NOT NULL,\n  ID_Plato INT NOT NULL,\n  Cantidad INT NOT NULL,\n  FOREIGN KEY (ID_Orden) REFERENCES Orden(ID_Orden),\n  FOREIGN KEY (ID_Plato) REFERENCES Plato(ID_Plato)",
    ),
    (
        "Factura",
        "ID_Factura {id},\n  ID_Orden INT NOT NULL,\n  Fecha_Emision DATE NOT NULL,\n  IVA DECIMAL(12, 2),\n  Total DECIMAL(12, 2),\n  FOREIGN KEY (ID_Orden) REFERENCES Orden(ID_Orden)",
    ),
    (
        "PQRS",
        "ID_Solicitud {id},\n  RUT VARCHAR(20) NOT NULL,\n  Tipo_Solicitud VARCHAR(50) NOT NULL,\n  Descripcion TEXT,\n  Fecha DATE NOT NULL,\n  FOREIGN KEY (RUT) REFERENCES Restaurante(RUT)",
    ),
];

/// Statements that drop and recreate the restaurant schema, one statement
/// each so they can go through prepared execution.
pub fn restaurant_schema(engine: DatabaseType) -> Vec<String> {
    let (identity, datetime) = match engine {
        DatabaseType::PostgreSQL => ("SERIAL PRIMARY KEY", "TIMESTAMP"),
        DatabaseType::MySQL => ("INT AUTO_INCREMENT PRIMARY KEY", "DATETIME"),
    };

    let drops = RESTAURANT_TABLES
        .iter()
        .rev()
        .map(|(table, _)| format!("DROP TABLE IF EXISTS {}", table));
    let creates = RESTAURANT_TABLES.iter().map(|(table, columns)| {
        let columns = columns
            .replace("{id}", identity)
            .replace("{datetime}", datetime);
        format!("CREATE TABLE {} (\n  {}\n)", table, columns)
    });
    drops.chain(creates).collect()
}

const CLAUSE_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "HAVING", "UNION", "INSERT",
    "UPDATE", "DELETE", "CREATE", "ALTER", "DROP",
];

/// Keywords that only open a clause when followed by `BY`
const BY_KEYWORDS: &[&str] = &["ORDER", "GROUP"];

const JOIN_QUALIFIERS: &[&str] = &["LEFT", "RIGHT", "INNER"];

/// Collapses whitespace, starts each major clause on a new line and indents
/// `AND` / `OR`. Keyword case is preserved.
pub fn format_sql(sql: &str) -> String {
    let words: Vec<&str> = sql.split_whitespace().collect();
    let mut out = String::with_capacity(sql.len());

    for (i, word) in words.iter().enumerate() {
        let upper = word.to_ascii_uppercase();
        let prev = i
            .checked_sub(1)
            .map(|p| words[p].to_ascii_uppercase())
            .unwrap_or_default();
        let next_is_by = words
            .get(i + 1)
            .is_some_and(|next| next.eq_ignore_ascii_case("BY"));

        let opens_clause = CLAUSE_KEYWORDS.contains(&upper.as_str())
            || (BY_KEYWORDS.contains(&upper.as_str()) && next_is_by);
        // LEFT JOIN and friends stay on one line
        let continues_join = upper == "JOIN" && JOIN_QUALIFIERS.contains(&prev.as_str());

        if i > 0 {
            if opens_clause && !continues_join {
                out.push('\n');
            } else if upper == "AND" || upper == "OR" {
                out.push_str("\n  ");
            } else {
                out.push(' ');
            }
        }
        out.push_str(word);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_before_clauses() {
        assert_eq!(
            format_sql("select  Nombre,\n\tPrecio from Plato where Precio > 10 and Activo = 1 order by Precio"),
            "select Nombre, Precio\nfrom Plato\nwhere Precio > 10\n  and Activo = 1\norder by Precio"
        );
    }

    #[test]
    fn test_join_qualifier_stays_with_join() {
        assert_eq!(
            format_sql("SELECT * FROM Orden o LEFT JOIN Mesa m ON m.ID_Mesa = o.ID_Mesa"),
            "SELECT *\nFROM Orden o\nLEFT JOIN Mesa m ON m.ID_Mesa = o.ID_Mesa"
        );
    }

    #[test]
    fn test_order_without_by_is_plain_word() {
        assert_eq!(
            format_sql("SELECT Order FROM t GROUP BY Order"),
            "SELECT Order\nFROM t\nGROUP BY Order"
        );
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(format_sql("  \n "), "");
    }

    #[test]
    fn test_templates_lookup() {
        assert_eq!(template("countAll"), Some("SELECT COUNT(*) FROM table_name"));
        assert!(template("nope").is_none());
        assert!(SQL_TEMPLATES.iter().all(|(_, sql)| !sql.trim().is_empty()));
    }

    #[test]
    fn test_domain_templates_use_schema_columns() {
        let low_stock = template("lowStock").unwrap();
        assert!(low_stock.contains("Cantidad_Stock"));
        assert!(low_stock.contains("Materias_Primas"));

        let schema = restaurant_schema(DatabaseType::PostgreSQL).join("\n");
        for column in ["Cantidad_Stock", "Nombre_Ingrediente", "Precio", "Fecha_Emision", "Cantidad"] {
            assert!(schema.contains(column), "{}", column);
        }
        assert!(template("listOrders").unwrap().contains("JOIN Detalle_Orden d"));
        assert!(dish_ingredients(7).ends_with("WHERE pi.ID_Plato = 7"));
    }

    #[test]
    fn test_restaurant_schema_per_engine() {
        let pg = restaurant_schema(DatabaseType::PostgreSQL);
        let tables = RESTAURANT_TABLES.len();
        assert_eq!(pg.len(), tables * 2);
        assert_eq!(pg[0], "DROP TABLE IF EXISTS PQRS");
        assert_eq!(pg[tables - 1], "DROP TABLE IF EXISTS Restaurante");
        assert!(pg[tables].starts_with("CREATE TABLE Restaurante ("));
        assert!(pg.iter().all(|sql| !sql.contains('{') && !sql.contains(';')));
        assert!(pg.iter().any(|sql| sql.contains("ID_Plato SERIAL PRIMARY KEY")));
        assert!(pg.iter().any(|sql| sql.contains("Fecha_Hora TIMESTAMP NOT NULL")));

        let mysql = restaurant_schema(DatabaseType::MySQL);
        assert!(mysql.iter().any(|sql| sql.contains("ID_Plato INT AUTO_INCREMENT PRIMARY KEY")));
        assert!(mysql.iter().any(|sql| sql.contains("Fecha_Hora DATETIME NOT NULL")));
    }
}
