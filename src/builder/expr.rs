use crate::ast::{
    ArithOperator, BinOperator, Expr, FloatLiteral, FunctionCallStarExpr, IntLiteral,
};
use crate::error::{Result, SemanticError};
use crate::tree::{ParseTree, Tag};

pub(crate) fn arith_operator(tag: &Tag) -> Option<ArithOperator> {
    match tag {
        Tag::Plus => Some(ArithOperator::Add),
        Tag::Minus => Some(ArithOperator::Sub),
        Tag::Star => Some(ArithOperator::Mul),
        Tag::Divide => Some(ArithOperator::Div),
        _ => None,
    }
}

pub(crate) fn bin_operator(tag: &Tag) -> Option<BinOperator> {
    match tag {
        Tag::Equal => Some(BinOperator::Eq),
        Tag::NotEqual => Some(BinOperator::Ne),
        Tag::LessThanOrEqualTo => Some(BinOperator::Le),
        Tag::GreaterThanOrEqualTo => Some(BinOperator::Ge),
        Tag::LessThan => Some(BinOperator::Lt),
        Tag::GreaterThan => Some(BinOperator::Gt),
        _ => None,
    }
}

/// Lowers an operand: arithmetic, column reference, literal or `name(*)`.
pub fn build_expr(node: &ParseTree) -> Result<Expr> {
    if let Some(op) = arith_operator(&node.tag) {
        return build_arithmetic(node, op);
    }

    match &node.tag {
        Tag::Dot => build_dot(node),
        Tag::TableOrCol => {
            let name = node
                .first_child_text()
                .ok_or_else(|| SemanticError::unsupported("column reference", &node.tag))?;
            Ok(Expr::field("", name))
        }
        Tag::Number => Ok(Expr::number(node.text.as_str())),
        Tag::BigintLiteral | Tag::SmallintLiteral | Tag::TinyintLiteral => Ok(Expr::Int(IntLiteral {
            text: node.text.clone(),
        })),
        Tag::DecimalLiteral => Ok(Expr::Float(FloatLiteral {
            text: node.text.clone(),
        })),
        Tag::StringLiteral => Ok(Expr::string(node.text.as_str())),
        Tag::FunctionStar => {
            let name = node
                .first_child_text()
                .ok_or_else(|| SemanticError::unsupported("function call", &node.tag))?;
            Ok(Expr::FunctionCallStar(FunctionCallStarExpr {
                name: name.to_string(),
            }))
        }
        tag => Err(SemanticError::unsupported("expression", tag)),
    }
}

fn build_arithmetic(node: &ParseTree, op: ArithOperator) -> Result<Expr> {
    let [left, right] = node.children.as_slice() else {
        return Err(SemanticError::unsupported(
            "arithmetic",
            format!("{} with {} operands", node.tag, node.children.len()),
        ));
    };
    Ok(Expr::arithmetic(op, build_expr(left)?, build_expr(right)?))
}

// DOT(TOK_TABLE_OR_COL(qualifier), Identifier(name))
fn build_dot(node: &ParseTree) -> Result<Expr> {
    let qualifier = node
        .child(0)
        .filter(|c| c.tag == Tag::TableOrCol)
        .and_then(ParseTree::first_child_text);
    let name = node
        .child(1)
        .filter(|c| c.tag == Tag::Identifier)
        .map(|c| c.text.as_str());

    match (qualifier, name, node.children.len()) {
        (Some(qualifier), Some(name), 2) => Ok(Expr::field(qualifier, name)),
        _ => Err(SemanticError::unsupported("qualified column", node.to_string())),
    }
}

/// Lowers a comparison node into a `BinaryPredicate`.
pub fn build_predicate(node: &ParseTree) -> Result<Expr> {
    let op = bin_operator(&node.tag)
        .ok_or_else(|| SemanticError::unsupported("predicate", &node.tag))?;
    build_bin_predicate(node, op)
}

pub(crate) fn build_bin_predicate(node: &ParseTree, op: BinOperator) -> Result<Expr> {
    let [left, right] = node.children.as_slice() else {
        return Err(SemanticError::unsupported(
            "binary predicate",
            format!("{} with {} operands", node.tag, node.children.len()),
        ));
    };
    Ok(Expr::predicate(op, build_expr(left)?, build_expr(right)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> ParseTree {
        ParseTree::node(Tag::TableOrCol, vec![ParseTree::leaf(Tag::Identifier, name)])
    }

    fn dot(qualifier: &str, name: &str) -> ParseTree {
        ParseTree::node(Tag::Dot, vec![col(qualifier), ParseTree::leaf(Tag::Identifier, name)])
    }

    #[test]
    fn test_build_arithmetic() {
        let tree = ParseTree::node(
            Tag::Star,
            vec![
                ParseTree::node(Tag::Plus, vec![col("a"), dot("t", "b")]),
                ParseTree::leaf(Tag::Number, "2.5"),
            ],
        );
        let expr = build_expr(&tree).unwrap();
        let Expr::Arithmetic(mul) = &expr else {
            panic!("expected arithmetic, got {expr:?}");
        };
        assert_eq!(mul.operator, ArithOperator::Mul);
        assert!(matches!(*mul.right, Expr::Float(_)));
        assert_eq!(expr.to_sql(), "(a + t.b) * 2.5");
    }

    #[test]
    fn test_build_literals() {
        assert!(matches!(
            build_expr(&ParseTree::leaf(Tag::Number, "3")).unwrap(),
            Expr::Int(_)
        ));
        assert!(matches!(
            build_expr(&ParseTree::leaf(Tag::Number, "3.0")).unwrap(),
            Expr::Float(_)
        ));
        assert!(matches!(
            build_expr(&ParseTree::leaf(Tag::BigintLiteral, "3L")).unwrap(),
            Expr::Int(ref i) if i.text == "3L"
        ));
        assert!(matches!(
            build_expr(&ParseTree::leaf(Tag::DecimalLiteral, "3BD")).unwrap(),
            Expr::Float(_)
        ));
        assert_eq!(
            build_expr(&ParseTree::leaf(Tag::StringLiteral, "'abc'"))
                .unwrap()
                .to_sql(),
            "'abc'"
        );
    }

    #[test]
    fn test_build_function_star() {
        let tree = ParseTree::node(
            Tag::FunctionStar,
            vec![ParseTree::leaf(Tag::Identifier, "count")],
        );
        assert_eq!(build_expr(&tree).unwrap().to_sql(), "count(*)");
    }

    #[test]
    fn test_build_predicate() {
        for (tag, symbol) in [
            (Tag::Equal, "="),
            (Tag::NotEqual, "!="),
            (Tag::LessThanOrEqualTo, "<="),
            (Tag::GreaterThanOrEqualTo, ">="),
            (Tag::LessThan, "<"),
            (Tag::GreaterThan, ">"),
        ] {
            let tree = ParseTree::node(tag, vec![col("a"), ParseTree::leaf(Tag::Number, "5")]);
            assert_eq!(build_predicate(&tree).unwrap().to_sql(), format!("a {symbol} 5"));
        }
    }

    #[test]
    fn test_predicate_needs_two_operands() {
        let tree = ParseTree::node(Tag::Equal, vec![col("a")]);
        assert!(matches!(
            build_predicate(&tree),
            Err(SemanticError::UnsupportedConstruct { context: "binary predicate", .. })
        ));
    }

    #[test]
    fn test_reject_unknown_tags() {
        let null = ParseTree::leaf(Tag::Other("TOK_NULL".to_string()), "NULL");
        let err = build_expr(&null).unwrap_err();
        assert_eq!(
            err,
            SemanticError::UnsupportedConstruct {
                context: "expression",
                tag: "TOK_NULL".to_string()
            }
        );

        // comparisons are not operands
        let nested = ParseTree::node(
            Tag::Plus,
            vec![ParseTree::node(Tag::Equal, vec![col("a"), col("b")]), col("c")],
        );
        assert!(build_expr(&nested).is_err());

        let malformed = ParseTree::node(Tag::Dot, vec![col("t")]);
        assert!(build_expr(&malformed).is_err());
    }
}
