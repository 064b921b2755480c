//! Recursive-descent parser.
//!
//! Consumes tokens on demand from the lexer and builds `ast::Statement`
//! trees. Classes are resolved at parse time: a declared class's object is
//! referenced directly by `NewInstance` nodes and by subclasses naming it as
//! their base, while the emitted `ClassDefinition` statement publishes it
//! into the executing scope.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};

use crate::ast::Statement;
use crate::lexer::Lexer;
use crate::runtime::class::{Class, Method};
use crate::runtime::compare;
use crate::runtime::object::{Object, ObjectHolder};
use crate::token::Token;

pub fn parse_program(lexer: Lexer<'_>) -> Result<Statement> {
    Parser::new(lexer).program()
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Declared classes by name. Each entry is the holder shared by the
    /// class's `ClassDefinition` node and every `NewInstance` node naming
    /// the class.
    classes: HashMap<String, ObjectHolder>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn program(mut self) -> Result<Statement> {
        let mut statements = Vec::new();
        while *self.lexer.current() != Token::Eof {
            if *self.lexer.current() == Token::Newline {
                self.lexer.next()?;
                continue;
            }
            statements.push(self.statement()?);
        }
        Ok(Statement::compound(statements))
    }

    fn statement(&mut self) -> Result<Statement> {
        match self.lexer.current() {
            Token::Class => self.class_definition(),
            Token::If => self.if_statement(),
            _ => {
                let statement = self.simple_statement()?;
                self.end_of_line()?;
                Ok(statement)
            }
        }
    }

    fn class_definition(&mut self) -> Result<Statement> {
        let name = self.lexer.expect_next_id()?.to_string();
        self.lexer.next()?;

        let parent = if *self.lexer.current() == Token::Char('(') {
            let parent_name = self.lexer.expect_next_id()?.to_string();
            self.lexer.expect_next(&Token::Char(')'))?;
            self.lexer.next()?;
            let parent = self
                .classes
                .get(&parent_name)
                .and_then(ObjectHolder::as_class)
                .ok_or_else(|| anyhow!("Unknown base class '{parent_name}' for '{name}'"))?;
            Some(parent)
        } else {
            None
        };

        self.lexer.expect(&Token::Char(':'))?;
        self.lexer.expect_next(&Token::Newline)?;
        self.lexer.expect_next(&Token::Indent)?;
        self.lexer.next()?;

        // The class is registered before its body parses, so methods can
        // construct instances of the class they belong to. The shared holder
        // is finalized once the method table is complete.
        let class_holder = ObjectHolder::own(Object::Class(Rc::new(Class::new(
            name.clone(),
            Vec::new(),
            parent.clone(),
        ))));
        self.classes.insert(name.clone(), class_holder.clone());

        let mut methods = Vec::new();
        while *self.lexer.current() != Token::Dedent {
            if *self.lexer.current() == Token::Newline {
                self.lexer.next()?;
                continue;
            }
            methods.push(self.method_definition()?);
        }
        self.lexer.next()?;

        let class = Rc::new(Class::new(name, methods, parent));
        class_holder.replace(Object::Class(class));
        Ok(Statement::ClassDefinition {
            class: class_holder,
        })
    }

    fn method_definition(&mut self) -> Result<Method> {
        self.lexer.expect(&Token::Def)?;
        let name = self.lexer.expect_next_id()?.to_string();
        self.lexer.expect_next(&Token::Char('('))?;
        self.lexer.next()?;

        let mut params = Vec::new();
        if *self.lexer.current() != Token::Char(')') {
            loop {
                params.push(self.lexer.expect_id()?.to_string());
                self.lexer.next()?;
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.next()?;
            }
        }
        if params.is_empty() {
            bail!("Method '{name}' must declare a receiver parameter");
        }
        // The first parameter is the receiver; the runtime binds it as
        // `self`.
        let formal_params = params.split_off(1);

        self.lexer.expect(&Token::Char(')'))?;
        self.lexer.expect_next(&Token::Char(':'))?;
        self.lexer.next()?;
        let body = self.suite()?;

        Ok(Method {
            name,
            formal_params,
            body: Statement::method_body(body),
        })
    }

    fn if_statement(&mut self) -> Result<Statement> {
        self.lexer.next()?;
        let condition = self.expression()?;
        self.lexer.expect(&Token::Char(':'))?;
        self.lexer.next()?;
        let if_body = self.suite()?;

        let else_body = if *self.lexer.current() == Token::Else {
            self.lexer.expect_next(&Token::Char(':'))?;
            self.lexer.next()?;
            Some(self.suite()?)
        } else {
            None
        };

        Ok(Statement::if_else(condition, if_body, else_body))
    }

    fn suite(&mut self) -> Result<Statement> {
        self.lexer.expect(&Token::Newline)?;
        self.lexer.expect_next(&Token::Indent)?;
        self.lexer.next()?;

        let mut statements = Vec::new();
        while *self.lexer.current() != Token::Dedent {
            if *self.lexer.current() == Token::Newline {
                self.lexer.next()?;
                continue;
            }
            statements.push(self.statement()?);
        }
        self.lexer.next()?;
        Ok(Statement::compound(statements))
    }

    fn simple_statement(&mut self) -> Result<Statement> {
        match self.lexer.current() {
            Token::Print => self.print_statement(),
            Token::Return => self.return_statement(),
            _ => {
                let expression = self.expression()?;
                if *self.lexer.current() == Token::Char('=') {
                    self.lexer.next()?;
                    let value = self.expression()?;
                    return self.assignment(expression, value);
                }
                Ok(expression)
            }
        }
    }

    fn assignment(&mut self, target: Statement, value: Statement) -> Result<Statement> {
        let Statement::Variable { mut dotted_ids } = target else {
            bail!("Assignment target must be a variable or an object field");
        };
        match dotted_ids.pop() {
            Some(var) if dotted_ids.is_empty() => Ok(Statement::assignment(var, value)),
            Some(field) => Ok(Statement::field_assignment(
                Statement::variable(dotted_ids),
                field,
                value,
            )),
            None => bail!("Assignment target must name a variable"),
        }
    }

    fn print_statement(&mut self) -> Result<Statement> {
        self.lexer.next()?;
        let mut args = Vec::new();
        if *self.lexer.current() != Token::Newline {
            loop {
                args.push(self.expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.next()?;
            }
        }
        Ok(Statement::print(args))
    }

    fn return_statement(&mut self) -> Result<Statement> {
        self.lexer.next()?;
        if *self.lexer.current() == Token::Newline {
            return Ok(Statement::ret(Statement::none()));
        }
        Ok(Statement::ret(self.expression()?))
    }

    fn expression(&mut self) -> Result<Statement> {
        self.or_test()
    }

    fn or_test(&mut self) -> Result<Statement> {
        let mut lhs = self.and_test()?;
        while *self.lexer.current() == Token::Or {
            self.lexer.next()?;
            lhs = Statement::or(lhs, self.and_test()?);
        }
        Ok(lhs)
    }

    fn and_test(&mut self) -> Result<Statement> {
        let mut lhs = self.not_test()?;
        while *self.lexer.current() == Token::And {
            self.lexer.next()?;
            lhs = Statement::and(lhs, self.not_test()?);
        }
        Ok(lhs)
    }

    fn not_test(&mut self) -> Result<Statement> {
        if *self.lexer.current() == Token::Not {
            self.lexer.next()?;
            return Ok(Statement::not(self.not_test()?));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Statement> {
        let lhs = self.arith()?;
        let comparator: compare::Comparator = match self.lexer.current() {
            Token::Eq => compare::equal,
            Token::NotEq => compare::not_equal,
            Token::Char('<') => compare::less,
            Token::Char('>') => compare::greater,
            Token::LessOrEq => compare::less_or_equal,
            Token::GreaterOrEq => compare::greater_or_equal,
            _ => return Ok(lhs),
        };
        self.lexer.next()?;
        let rhs = self.arith()?;
        Ok(Statement::comparison(comparator, lhs, rhs))
    }

    fn arith(&mut self) -> Result<Statement> {
        let mut lhs = self.term()?;
        loop {
            match self.lexer.current() {
                Token::Char('+') => {
                    self.lexer.next()?;
                    lhs = Statement::add(lhs, self.term()?);
                }
                Token::Char('-') => {
                    self.lexer.next()?;
                    lhs = Statement::sub(lhs, self.term()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Statement> {
        let mut lhs = self.primary()?;
        loop {
            match self.lexer.current() {
                Token::Char('*') => {
                    self.lexer.next()?;
                    lhs = Statement::mult(lhs, self.primary()?);
                }
                Token::Char('/') => {
                    self.lexer.next()?;
                    lhs = Statement::div(lhs, self.primary()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn primary(&mut self) -> Result<Statement> {
        let mut expression = match self.lexer.current().clone() {
            Token::Number(value) => {
                self.lexer.next()?;
                Statement::numeric_const(value)
            }
            Token::String(value) => {
                self.lexer.next()?;
                Statement::string_const(value)
            }
            Token::True => {
                self.lexer.next()?;
                Statement::bool_const(true)
            }
            Token::False => {
                self.lexer.next()?;
                Statement::bool_const(false)
            }
            Token::None => {
                self.lexer.next()?;
                Statement::none()
            }
            Token::Char('(') => {
                self.lexer.next()?;
                let inner = self.expression()?;
                self.lexer.expect(&Token::Char(')'))?;
                self.lexer.next()?;
                inner
            }
            Token::Id(name) => {
                self.lexer.next()?;
                self.identifier_expression(name)?
            }
            other => bail!("Expected an expression, found {other:?}"),
        };

        // Chained method calls on whatever the base expression produced,
        // e.g. `Dog('Rex').bark()`.
        while *self.lexer.current() == Token::Char('.') {
            let method = self.lexer.expect_next_id()?.to_string();
            self.lexer.next()?;
            let args = self.call_arguments()?;
            expression = Statement::method_call(expression, method, args);
        }
        Ok(expression)
    }

    /// Parses the remainder of an expression starting with `first`: a dotted
    /// name chain, optionally called. A called single name is a class
    /// constructor or the builtin `str`; a called chain is a method call on
    /// the chain's prefix.
    fn identifier_expression(&mut self, first: String) -> Result<Statement> {
        let mut chain = vec![first];
        while *self.lexer.current() == Token::Char('.') {
            chain.push(self.lexer.expect_next_id()?.to_string());
            self.lexer.next()?;
        }

        if *self.lexer.current() != Token::Char('(') {
            return Ok(Statement::variable(chain));
        }
        let args = self.call_arguments()?;

        let last = match chain.pop() {
            Some(name) => name,
            None => bail!("Expected a name before '('"),
        };
        if !chain.is_empty() {
            return Ok(Statement::method_call(
                Statement::variable(chain),
                last,
                args,
            ));
        }

        if last == "str" {
            let mut args = args;
            if let Some(arg) = args.pop()
                && args.is_empty()
            {
                return Ok(Statement::stringify(arg));
            }
            bail!("str() takes exactly one argument");
        }

        let class = self
            .classes
            .get(&last)
            .cloned()
            .ok_or_else(|| anyhow!("'{last}' is not a known class"))?;
        Ok(Statement::new_instance(class, args))
    }

    /// Consumes `( expression, ... )`.
    fn call_arguments(&mut self) -> Result<Vec<Statement>> {
        self.lexer.expect(&Token::Char('('))?;
        self.lexer.next()?;
        let mut args = Vec::new();
        if *self.lexer.current() != Token::Char(')') {
            loop {
                args.push(self.expression()?);
                if *self.lexer.current() != Token::Char(',') {
                    break;
                }
                self.lexer.next()?;
            }
        }
        self.lexer.expect(&Token::Char(')'))?;
        self.lexer.next()?;
        Ok(args)
    }

    fn end_of_line(&mut self) -> Result<()> {
        self.lexer.expect(&Token::Newline)?;
        self.lexer.next()?;
        Ok(())
    }
}
