pub mod statement_line;
