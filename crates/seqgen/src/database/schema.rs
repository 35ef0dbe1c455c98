/// A database object a generator needs, as produced for schema export.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SchemaObject {
    Sequence {
        name: String,
        initial_value: i64,
        increment: i64,
    },
    Table {
        name: String,
        /// Segment key column and its `varchar` length, absent for
        /// single-row tables.
        segment_column: Option<(String, u32)>,
        value_column: String,
        /// Row inserted right after creation. Segmented tables create their
        /// rows lazily instead.
        seed_value: Option<i64>,
    },
}

impl SchemaObject {
    pub fn name(&self) -> &str {
        match self {
            Self::Sequence { name, .. } | Self::Table { name, .. } => name,
        }
    }

    /// ANSI DDL creating the object.
    pub fn create_sql(&self) -> Vec<String> {
        match self {
            Self::Sequence {
                name,
                initial_value,
                increment,
            } => vec![format!(
                "create sequence {name} start with {initial_value} increment by {increment}"
            )],
            Self::Table {
                name,
                segment_column: Some((segment, length)),
                value_column,
                ..
            } => vec![format!(
                "create table {name} ( {segment} varchar({length}) not null, {value_column} bigint, primary key ( {segment} ) )"
            )],
            Self::Table {
                name,
                segment_column: None,
                value_column,
                seed_value,
            } => {
                let mut sql = vec![format!("create table {name} ( {value_column} bigint )")];
                if let Some(seed) = seed_value {
                    sql.push(format!("insert into {name} values ( {seed} )"));
                }
                sql
            }
        }
    }

    /// ANSI DDL dropping the object.
    pub fn drop_sql(&self) -> Vec<String> {
        match self {
            Self::Sequence { name, .. } => vec![format!("drop sequence if exists {name}")],
            Self::Table { name, .. } => vec![format!("drop table if exists {name}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ddl() {
        let object = SchemaObject::Sequence {
            name: "app.order_seq".into(),
            initial_value: 1,
            increment: 50,
        };
        assert_eq!(
            object.create_sql(),
            ["create sequence app.order_seq start with 1 increment by 50"]
        );
        assert_eq!(object.drop_sql(), ["drop sequence if exists app.order_seq"]);
    }

    #[test]
    fn single_row_table_ddl_seeds_the_row() {
        let object = SchemaObject::Table {
            name: "order_seq".into(),
            segment_column: None,
            value_column: "next_val".into(),
            seed_value: Some(1),
        };
        assert_eq!(
            object.create_sql(),
            [
                "create table order_seq ( next_val bigint )",
                "insert into order_seq values ( 1 )"
            ]
        );
    }

    #[test]
    fn segmented_table_ddl() {
        let object = SchemaObject::Table {
            name: "id_generators".into(),
            segment_column: Some(("sequence_name".into(), 255)),
            value_column: "next_val".into(),
            seed_value: None,
        };
        assert_eq!(
            object.create_sql(),
            ["create table id_generators ( sequence_name varchar(255) not null, next_val bigint, primary key ( sequence_name ) )"]
        );
        assert_eq!(object.name(), "id_generators");
    }
}
