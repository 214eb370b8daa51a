use crate::ast::{BinOperator, JoinOperator, TableRef, TableRefs};
use crate::builder::expr::build_bin_predicate;
use crate::builder::stmt::build_query_select;
use crate::error::{Result, SemanticError};
use crate::tree::{ParseTree, Tag};

pub(crate) fn join_operator(tag: &Tag) -> Option<JoinOperator> {
    match tag {
        Tag::Join => Some(JoinOperator::Inner),
        Tag::LeftOuterJoin => Some(JoinOperator::LeftOuter),
        Tag::RightOuterJoin => Some(JoinOperator::RightOuter),
        Tag::FullOuterJoin => Some(JoinOperator::FullOuter),
        Tag::CrossJoin => Some(JoinOperator::Cross),
        _ => None,
    }
}

/// Lowers a `TOK_FROM` node into an ordered chain of table references.
pub fn build_from(node: &ParseTree) -> Result<TableRefs> {
    let mut refs = TableRefs::new();
    for child in &node.children {
        if let Some(op) = join_operator(&child.tag) {
            refs.append(build_join(child, op)?);
            continue;
        }
        match &child.tag {
            Tag::TabRef => refs.push(build_base_table_ref(child)?),
            Tag::SubQuery => refs.push(build_inline_view_ref(child)?),
            tag => return Err(SemanticError::unsupported("from", tag)),
        }
    }
    Ok(refs)
}

// The left subtree (possibly another join) comes first, then the right-hand
// table and the on-clause. The last reference is joined with the one before.
fn build_join(node: &ParseTree, op: JoinOperator) -> Result<TableRefs> {
    let mut refs = TableRefs::new();
    let mut on_clause = None;

    for child in &node.children {
        if let Some(inner) = join_operator(&child.tag) {
            refs.append(build_join(child, inner)?);
            continue;
        }
        match &child.tag {
            Tag::TabRef => refs.push(build_base_table_ref(child)?),
            Tag::SubQuery => refs.push(build_inline_view_ref(child)?),
            Tag::Equal => on_clause = Some(build_bin_predicate(child, BinOperator::Eq)?),
            Tag::And => return Err(SemanticError::UnsupportedJoinCondition(child.to_string())),
            tag => return Err(SemanticError::unsupported("join", tag)),
        }
    }

    if refs.len() < 2 {
        return Err(SemanticError::MalformedJoin(refs.len()));
    }
    refs.attach_join(op, on_clause);
    Ok(refs)
}

// TOK_TABREF(TOK_TABNAME(name), [alias])
fn build_base_table_ref(node: &ParseTree) -> Result<TableRef> {
    let mut table = None;
    let mut alias = None;

    for child in &node.children {
        match &child.tag {
            Tag::TabName => table = Some(build_table_name(child)?),
            Tag::Identifier => alias = Some(child.text.clone()),
            tag => return Err(SemanticError::unsupported("base table", tag)),
        }
    }

    let table = table.ok_or_else(|| SemanticError::unsupported("base table", node.to_string()))?;
    Ok(TableRef::base(table, alias))
}

/// Reads `TOK_TABNAME(name)`. Database-qualified names have no lowering rule.
pub(crate) fn build_table_name(node: &ParseTree) -> Result<String> {
    match node.children.as_slice() {
        [name] if node.tag == Tag::TabName => Ok(name.text.clone()),
        _ => Err(SemanticError::unsupported("table name", node.to_string())),
    }
}

// TOK_SUBQUERY(TOK_QUERY(...), [alias])
fn build_inline_view_ref(node: &ParseTree) -> Result<TableRef> {
    let mut subquery = None;
    let mut alias = None;

    for child in &node.children {
        match &child.tag {
            Tag::Query => subquery = Some(build_query_select(child)?),
            Tag::Identifier => alias = Some(child.text.clone()),
            tag => return Err(SemanticError::unsupported("inline view", tag)),
        }
    }

    let subquery =
        subquery.ok_or_else(|| SemanticError::unsupported("inline view", node.to_string()))?;
    Ok(TableRef::inline_view(subquery, alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn ident(text: &str) -> ParseTree {
        ParseTree::leaf(Tag::Identifier, text)
    }

    fn tabref(name: &str, alias: Option<&str>) -> ParseTree {
        let mut children = vec![ParseTree::node(Tag::TabName, vec![ident(name)])];
        children.extend(alias.map(ident));
        ParseTree::node(Tag::TabRef, children)
    }

    fn dot(qualifier: &str, name: &str) -> ParseTree {
        ParseTree::node(
            Tag::Dot,
            vec![
                ParseTree::node(Tag::TableOrCol, vec![ident(qualifier)]),
                ident(name),
            ],
        )
    }

    fn eq(left: ParseTree, right: ParseTree) -> ParseTree {
        ParseTree::node(Tag::Equal, vec![left, right])
    }

    fn subquery(table: &str, alias: &str) -> ParseTree {
        let query = ParseTree::node(
            Tag::Query,
            vec![
                ParseTree::node(Tag::From, vec![tabref(table, None)]),
                ParseTree::node(
                    Tag::Insert,
                    vec![ParseTree::node(
                        Tag::Select,
                        vec![ParseTree::node(
                            Tag::SelExpr,
                            vec![ParseTree::node(Tag::TableOrCol, vec![ident("x")])],
                        )],
                    )],
                ),
            ],
        );
        ParseTree::node(Tag::SubQuery, vec![query, ident(alias)])
    }

    #[test]
    fn test_single_table() {
        let from = ParseTree::node(Tag::From, vec![tabref("t", Some("x"))]);
        let refs = build_from(&from).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.get(0).unwrap().alias(), Some("x"));
        assert!(refs.get(0).unwrap().join().is_none());
        assert_eq!(refs.to_sql(), "t x");
    }

    #[test]
    fn test_left_deep_join_chain() {
        // A JOIN B ON a.x = b.y JOIN C ON b.z = c.w
        let inner = ParseTree::node(
            Tag::Join,
            vec![tabref("A", Some("a")), tabref("B", Some("b")), eq(dot("a", "x"), dot("b", "y"))],
        );
        let outer = ParseTree::node(
            Tag::Join,
            vec![inner, tabref("C", Some("c")), eq(dot("b", "z"), dot("c", "w"))],
        );
        let refs = build_from(&ParseTree::node(Tag::From, vec![outer])).unwrap();

        assert_eq!(refs.len(), 3);
        assert!(std::ptr::eq(refs.left_tbl_ref(2).unwrap(), refs.get(1).unwrap()));
        assert!(std::ptr::eq(refs.left_tbl_ref(1).unwrap(), refs.get(0).unwrap()));
        assert!(refs.left_tbl_ref(0).is_none());

        let join = refs.get(2).unwrap().join().unwrap();
        assert_eq!(join.operator, JoinOperator::Inner);
        assert!(matches!(join.on_clause, Some(Expr::Predicate(_))));
        assert_eq!(
            refs.to_sql(),
            "A a JOIN B b ON a.x = b.y JOIN C c ON b.z = c.w"
        );
    }

    #[test]
    fn test_join_operator_follows_tag() {
        for (tag, op) in [
            (Tag::LeftOuterJoin, JoinOperator::LeftOuter),
            (Tag::RightOuterJoin, JoinOperator::RightOuter),
            (Tag::FullOuterJoin, JoinOperator::FullOuter),
            (Tag::CrossJoin, JoinOperator::Cross),
        ] {
            let join = ParseTree::node(tag, vec![tabref("a", None), tabref("b", None)]);
            let refs = build_from(&ParseTree::node(Tag::From, vec![join])).unwrap();
            assert_eq!(refs.get(1).unwrap().join().unwrap().operator, op);
        }
    }

    #[test]
    fn test_join_with_subquery() {
        let join = ParseTree::node(
            Tag::LeftOuterJoin,
            vec![tabref("a", None), subquery("s", "v"), eq(dot("a", "id"), dot("v", "x"))],
        );
        let refs = build_from(&ParseTree::node(Tag::From, vec![join])).unwrap();
        assert!(matches!(refs.get(1).unwrap(), TableRef::InlineView(_)));
        assert_eq!(
            refs.to_sql(),
            "a LEFT OUTER JOIN (SELECT x FROM s) v ON a.id = v.x"
        );
    }

    #[test]
    fn test_conjunctive_on_clause_rejected() {
        let cond = ParseTree::node(
            Tag::And,
            vec![eq(dot("a", "x"), dot("b", "x")), eq(dot("a", "y"), dot("b", "y"))],
        );
        let join = ParseTree::node(Tag::Join, vec![tabref("a", None), tabref("b", None), cond]);
        let err = build_from(&ParseTree::node(Tag::From, vec![join])).unwrap_err();
        assert!(matches!(err, SemanticError::UnsupportedJoinCondition(_)));
    }

    #[test]
    fn test_single_table_join_is_malformed() {
        let join = ParseTree::node(Tag::Join, vec![tabref("a", None)]);
        let err = build_from(&ParseTree::node(Tag::From, vec![join])).unwrap_err();
        assert_eq!(err, SemanticError::MalformedJoin(1));
    }

    #[test]
    fn test_unsupported_from_elements() {
        let lateral = ParseTree::leaf(Tag::Other("TOK_LATERAL_VIEW".to_string()), "x");
        let from = ParseTree::node(Tag::From, vec![lateral]);
        assert!(matches!(
            build_from(&from),
            Err(SemanticError::UnsupportedConstruct { context: "from", .. })
        ));

        let qualified = ParseTree::node(
            Tag::TabRef,
            vec![ParseTree::node(Tag::TabName, vec![ident("db"), ident("t")])],
        );
        assert!(build_from(&ParseTree::node(Tag::From, vec![qualified])).is_err());

        let less = ParseTree::node(
            Tag::Join,
            vec![
                tabref("a", None),
                tabref("b", None),
                ParseTree::node(Tag::LessThan, vec![dot("a", "x"), dot("b", "x")]),
            ],
        );
        assert!(matches!(
            build_from(&ParseTree::node(Tag::From, vec![less])),
            Err(SemanticError::UnsupportedConstruct { context: "join", .. })
        ));
    }
}
