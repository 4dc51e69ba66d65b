/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 13/10/26
******************************************************************************/

mod support;



mod scenarios;
