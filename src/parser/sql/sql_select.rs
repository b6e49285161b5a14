use serde_json::{json, Map, Value};
use sqlparser::ast::{
    Distinct, Expr, GroupByExpr, Join, JoinConstraint, JoinOperator, OrderByExpr, Query, Select, SelectItem, SetExpr,
    SetOperator, SetQuantifier, TableAlias, TableFactor, TableWithJoins, Value as SqlValue, WildcardAdditionalOptions,
};

use crate::parser::{ast::attach_meta, sql::SqlIngest, ParserError, Result};

impl SqlIngest {
    pub(super) fn query_to_ql(&self, query: &Query) -> Result<Value> {
        if query.fetch.is_some() {
            return Err(self.unsupported("FETCH is not supported, use LIMIT", "fetch"));
        }
        if !query.locks.is_empty() {
            return Err(self.unsupported("locking clauses are not supported", "for "));
        }
        if !query.limit_by.is_empty() || query.for_clause.is_some() || query.settings.is_some() || query.format_clause.is_some() {
            return Err(self.unsupported(format!("unsupported query clause in '{}'", query), ""));
        }

        let has_tail = query.with.is_some() || query.order_by.is_some() || query.limit.is_some() || query.offset.is_some();

        match query.body.as_ref() {
            SetExpr::Select(select) => {
                let mut object = self.select_to_ql(select)?;
                self.query_tail_to_ql(query, &mut object)?;
                Ok(Value::Object(object))
            },
            SetExpr::Query(inner) if !has_tail => self.query_to_ql(inner),
            body @ SetExpr::SetOperation { .. } if !has_tail => self.set_expr_to_ql(body),
            SetExpr::SetOperation { .. } | SetExpr::Query(_) => {
                Err(self.unsupported("WITH, ORDER BY, LIMIT and OFFSET cannot wrap a set operation", ""))
            },
            SetExpr::Values(_) => Err(self.unsupported("VALUES lists are not supported", "values")),
            other => Err(self.unsupported(format!("unsupported query body '{}'", other), "")),
        }
    }

    /// WITH, ORDER BY, LIMIT and OFFSET live on the query, not the select.
    fn query_tail_to_ql(&self, query: &Query, object: &mut Map<String, Value>) -> Result<()> {
        if let Some(with) = &query.with {
            if with.recursive {
                return Err(self.unsupported("WITH RECURSIVE is not supported", "recursive"));
            }

            let mut ctes = Vec::with_capacity(with.cte_tables.len());
            for cte in &with.cte_tables {
                if cte.materialized.is_some() || cte.from.is_some() {
                    return Err(self.unsupported("CTE modifiers are not supported", "materialized"));
                }
                let alias = self.alias_name(&cte.alias)?;
                ctes.push(attach_meta(self.query_to_ql(&cte.query)?, Some(alias), None));
            }
            object.insert("with".into(), Value::Array(ctes));
        }

        if let Some(order_by) = &query.order_by {
            if order_by.interpolate.is_some() {
                return Err(self.unsupported("INTERPOLATE is not supported", "interpolate"));
            }
            let sorts = order_by.exprs.iter()
                .map(|sort| self.sort_to_ql(sort))
                .collect::<Result<Vec<_>>>()?;
            object.insert("orderBy".into(), Value::Array(sorts));
        }

        if let Some(limit) = &query.limit {
            object.insert("limit".into(), json!(self.count_literal(limit, "LIMIT")?));
        }
        if let Some(offset) = &query.offset {
            object.insert("offset".into(), json!(self.count_literal(&offset.value, "OFFSET")?));
        }

        Ok(())
    }

    fn count_literal(&self, expr: &Expr, clause: &str) -> Result<u64> {
        match expr {
            Expr::Value(SqlValue::Number(n, _)) => n.parse::<u64>()
                .map_err(|_| ParserError::invalid(format!("{} must be a non-negative integer, got {}", clause, n))),
            other => Err(self.unsupported(format!("{} must be an integer literal, got '{}'", clause, other), clause)),
        }
    }

    fn sort_to_ql(&self, sort: &OrderByExpr) -> Result<Value> {
        if sort.with_fill.is_some() {
            return Err(self.unsupported("WITH FILL is not supported", "with fill"));
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("sort"));
        object.insert("value".into(), self.expr_to_ql(&sort.expr)?);
        match sort.asc {
            Some(true) => { object.insert("direction".into(), json!("asc")); },
            Some(false) => { object.insert("direction".into(), json!("desc")); },
            None => {},
        }
        match sort.nulls_first {
            Some(true) => { object.insert("nulls".into(), json!("first")); },
            Some(false) => { object.insert("nulls".into(), json!("last")); },
            None => {},
        }
        Ok(Value::Object(object))
    }

    fn set_expr_to_ql(&self, body: &SetExpr) -> Result<Value> {
        match body {
            SetExpr::Select(select) => Ok(Value::Object(self.select_to_ql(select)?)),
            SetExpr::Query(query) => self.query_to_ql(query),
            SetExpr::SetOperation { op, set_quantifier, left, right } => {
                let key = match op {
                    SetOperator::Union => "union",
                    SetOperator::Intersect => "intersect",
                    SetOperator::Except => "except",
                    #[allow(unreachable_patterns)]
                    other => return Err(self.unsupported(format!("set operator {} is not supported", other), "")),
                };
                let all = match set_quantifier {
                    SetQuantifier::All => true,
                    SetQuantifier::Distinct | SetQuantifier::None => false,
                    other => return Err(self.unsupported(format!("{} {} is not supported", op, other), "")),
                };

                let mut object = Map::new();
                object.insert("type".into(), json!("select"));
                object.insert(key.into(), json!([self.set_expr_to_ql(left)?, self.set_expr_to_ql(right)?]));
                if all {
                    object.insert("all".into(), json!(true));
                }
                Ok(Value::Object(object))
            },
            SetExpr::Values(_) => Err(self.unsupported("VALUES lists are not supported", "values")),
            other => Err(self.unsupported(format!("unsupported query body '{}'", other), "")),
        }
    }

    fn select_to_ql(&self, select: &Select) -> Result<Map<String, Value>> {
        if select.top.is_some() || select.into.is_some() || !select.lateral_views.is_empty() || select.prewhere.is_some() {
            return Err(self.unsupported(format!("unsupported select clause in '{}'", select), ""));
        }
        if !select.cluster_by.is_empty() || !select.distribute_by.is_empty() || !select.sort_by.is_empty() {
            return Err(self.unsupported(format!("unsupported select clause in '{}'", select), ""));
        }
        if !select.named_window.is_empty() {
            return Err(self.unsupported("named windows are not supported", "window"));
        }
        if select.qualify.is_some() || select.connect_by.is_some() {
            return Err(self.unsupported(format!("unsupported select clause in '{}'", select), ""));
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("select"));

        match &select.distinct {
            Some(Distinct::Distinct) => { object.insert("distinct".into(), json!(true)); },
            Some(Distinct::On(_)) => return Err(self.unsupported("DISTINCT ON is not supported", "distinct on")),
            None => {},
        }

        self.from_to_ql(&select.from, &mut object)?;

        let columns = select.projection.iter()
            .map(|item| self.select_item_to_ql(item))
            .collect::<Result<Vec<_>>>()?;
        object.insert("columns".into(), Value::Array(columns));

        if let Some(selection) = &select.selection {
            object.insert("where".into(), self.expr_to_ql(selection)?);
        }

        match &select.group_by {
            GroupByExpr::Expressions(exprs, modifiers) => {
                if !modifiers.is_empty() {
                    return Err(self.unsupported("GROUP BY modifiers are not supported", "with"));
                }
                if !exprs.is_empty() {
                    object.insert("groupBy".into(), Value::Array(self.exprs_to_ql(exprs)?));
                }
            },
            GroupByExpr::All(_) => return Err(self.unsupported("GROUP BY ALL is not supported", "group by all")),
        }

        if let Some(having) = &select.having {
            object.insert("having".into(), self.expr_to_ql(having)?);
        }

        Ok(object)
    }

    /// The first FROM item is `from`; its joins and any further comma
    /// separated items become `joins` (the latter as cross joins).
    fn from_to_ql(&self, from: &[TableWithJoins], object: &mut Map<String, Value>) -> Result<()> {
        let Some((first, rest)) = from.split_first() else {
            return Ok(());
        };

        let (relation, lateral) = self.relation_to_ql(&first.relation)?;
        if lateral {
            return Err(self.unsupported("LATERAL is only allowed in joins", "lateral"));
        }
        object.insert("from".into(), relation);

        let mut joins = Vec::new();
        for join in &first.joins {
            joins.push(self.join_to_ql(join)?);
        }
        for item in rest {
            let (relation, lateral) = self.relation_to_ql(&item.relation)?;
            let join_type = if lateral { "lateral" } else { "cross" };
            joins.push(json!({ "type": "join", "joinType": join_type, "view": relation }));
            for join in &item.joins {
                joins.push(self.join_to_ql(join)?);
            }
        }

        if !joins.is_empty() {
            object.insert("joins".into(), Value::Array(joins));
        }
        Ok(())
    }

    fn join_to_ql(&self, join: &Join) -> Result<Value> {
        let (relation, lateral) = self.relation_to_ql(&join.relation)?;

        let (join_type, on) = match &join.join_operator {
            JoinOperator::Inner(constraint) => ("inner", self.join_constraint_to_ql(constraint)?),
            JoinOperator::LeftOuter(constraint) => ("left", self.join_constraint_to_ql(constraint)?),
            JoinOperator::RightOuter(constraint) => ("right", self.join_constraint_to_ql(constraint)?),
            JoinOperator::CrossJoin if lateral => ("lateral", None),
            JoinOperator::CrossJoin => ("cross", None),
            JoinOperator::FullOuter(_) => return Err(self.unsupported("FULL JOIN is not supported", "full")),
            other => return Err(self.unsupported(format!("join type {:?} is not supported", other), "join")),
        };

        if lateral && join_type != "lateral" {
            return Err(self.unsupported("LATERAL subqueries only support CROSS JOIN", "lateral"));
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("join"));
        object.insert("joinType".into(), json!(join_type));
        object.insert("view".into(), relation);
        if let Some(on) = on {
            object.insert("on".into(), on);
        }
        Ok(Value::Object(object))
    }

    fn join_constraint_to_ql(&self, constraint: &JoinConstraint) -> Result<Option<Value>> {
        match constraint {
            JoinConstraint::On(expr) => Ok(Some(self.expr_to_ql(expr)?)),
            JoinConstraint::None => Ok(None),
            JoinConstraint::Using(_) => Err(self.unsupported("JOIN ... USING is not supported, use ON", "using")),
            JoinConstraint::Natural => Err(self.unsupported("NATURAL JOIN is not supported", "natural")),
        }
    }

    /// Returns the relation and whether it was marked LATERAL.
    fn relation_to_ql(&self, relation: &TableFactor) -> Result<(Value, bool)> {
        match relation {
            TableFactor::Table { name, alias, args, .. } => {
                if args.is_some() {
                    return Err(self.unsupported("table functions are not supported", &name.to_string()));
                }
                let [ident] = name.0.as_slice() else {
                    return Err(self.unsupported(format!("qualified relation names are not supported: {}", name), &name.to_string()));
                };

                let alias = alias.as_ref().map(|alias| self.alias_name(alias)).transpose()?;

                if ident.quote_style == Some('"') {
                    if let Some(short) = self.extracted.short(&ident.value) {
                        let value = json!({ "type": "short", "value": short.to_string() });
                        return Ok((attach_meta(value, alias, None), false));
                    }
                }

                let value = match alias {
                    Some(alias) => json!({ "type": "view", "view": ident.value, "as": alias }),
                    None => Value::String(ident.value.clone()),
                };
                Ok((value, false))
            },
            TableFactor::Derived { lateral, subquery, alias, .. } => {
                let alias = alias.as_ref().map(|alias| self.alias_name(alias)).transpose()?;
                Ok((attach_meta(self.query_to_ql(subquery)?, alias, None), *lateral))
            },
            TableFactor::NestedJoin { .. } => Err(self.unsupported("parenthesized joins are not supported", "(")),
            other => Err(self.unsupported(format!("unsupported relation '{}'", other), "")),
        }
    }

    fn alias_name(&self, alias: &TableAlias) -> Result<String> {
        if !alias.columns.is_empty() {
            return Err(self.unsupported("column lists on aliases are not supported", &alias.to_string()));
        }
        Ok(alias.name.value.clone())
    }

    fn select_item_to_ql(&self, item: &SelectItem) -> Result<Value> {
        match item {
            SelectItem::UnnamedExpr(expr) => self.expr_to_ql(expr),
            SelectItem::ExprWithAlias { expr, alias } => Ok(attach_meta(self.expr_to_ql(expr)?, Some(alias.value.clone()), None)),
            SelectItem::Wildcard(options) => {
                self.check_wildcard(options)?;
                Ok(json!({ "type": "column", "column": "*" }))
            },
            SelectItem::QualifiedWildcard(name, options) => {
                self.check_wildcard(options)?;
                let [view] = name.0.as_slice() else {
                    return Err(self.unsupported(format!("qualified wildcard {}.* is not supported", name), &name.to_string()));
                };
                Ok(json!({ "type": "column", "column": "*", "view": view.value }))
            },
        }
    }

    fn check_wildcard(&self, options: &WildcardAdditionalOptions) -> Result<()> {
        if *options != WildcardAdditionalOptions::default() {
            return Err(self.unsupported(format!("wildcard options are not supported: *{}", options), "*"));
        }
        Ok(())
    }
}
